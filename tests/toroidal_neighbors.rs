use proptest::prelude::*;
use std::collections::HashSet;
use superboids_core::grid::{Direction, SpatialGrid};
use superboids_data::Vec2;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn test_neighbor_relation_is_symmetric(edge in 3usize..40, seed in 0usize..10_000) {
        let grid = SpatialGrid::new(edge as f64 * 1.1, edge);
        let id = seed % grid.len();
        for direction in Direction::ALL {
            let other = grid.neighbor(id, direction);
            prop_assert!(other < grid.len());
            prop_assert_eq!(grid.neighbor(other, direction.opposite()), id);
        }
    }

    #[test]
    fn test_nine_distinct_boxes(edge in 3usize..40, seed in 0usize..10_000) {
        let grid = SpatialGrid::new(edge as f64, edge);
        let id = seed % grid.len();
        let table = grid.neighbors_of(id);
        prop_assert_eq!(table[Direction::Here.slot()], id);
        let distinct: HashSet<_> = table.iter().collect();
        prop_assert_eq!(distinct.len(), 9);
    }

    #[test]
    fn test_box_index_covers_position(
        x in -49.99f64..49.99,
        y in -49.99f64..49.99,
    ) {
        let grid = SpatialGrid::new(100.0, 90);
        let id = grid.box_index_of(Vec2::new(x, y));
        prop_assert!(id < grid.len());
        // A small step east lands in the same box or its east neighbor.
        let east = grid.box_index_of(Vec2::new(x + 0.01, y));
        prop_assert!(east == id || east == grid.neighbor(id, Direction::East));
    }
}

#[test]
fn test_wraparound_at_the_seam() {
    let grid = SpatialGrid::new(30.0, 10);
    let west_edge = grid.box_index_of(Vec2::new(-14.9, 0.0));
    let east_edge = grid.box_index_of(Vec2::new(14.9, 0.0));
    assert_eq!(grid.neighbor(east_edge, Direction::East), west_edge);
    assert_eq!(grid.neighbor(west_edge, Direction::West), east_edge);
    assert!(grid.is_edge(west_edge) && grid.is_edge(east_edge));
}
