/// Asserts that every live particle sits in the grid box covering its
/// position, exactly once.
#[macro_export]
macro_rules! assert_grid_consistent {
    ($sim:expr) => {
        let misplaced = $sim.misplaced_particles();
        assert!(
            misplaced.is_empty(),
            "{} particles misplaced at step {}: {:?}",
            misplaced.len(),
            $sim.current_step(),
            &misplaced[..misplaced.len().min(5)]
        );
    };
}

/// Asserts the number of live cells.
#[macro_export]
macro_rules! assert_live_cells {
    ($sim:expr, $count:expr) => {
        assert_eq!($sim.live_count(), $count, "Live cell count mismatch");
    };
}

/// Asserts that every particle of every active cell has finite state.
#[macro_export]
macro_rules! assert_finite_state {
    ($sim:expr) => {
        for cell in $sim.cells().iter().filter(|c| c.is_active()) {
            for p in &cell.particles {
                assert!(
                    p.position.is_finite() && p.velocity.is_finite(),
                    "Cell {} particle {} is not finite",
                    cell.id,
                    p.key.index
                );
            }
        }
    };
}
