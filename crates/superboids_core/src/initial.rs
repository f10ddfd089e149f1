//! Initial placement of the population.

use crate::boundary::inside_any_hole;
use crate::cell::Cell;
use crate::config::Settings;
use crate::error::{EngineError, Result};
use crate::geometry::{wrap_coordinate, Displacement};
use crate::grid::SpatialGrid;
use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::{FRAC_PI_3, TAU};
use superboids_data::{BoundaryCondition, CellType, InitialCondition, InitialState, Vec2};

/// Slack of the wall check; a nucleus may start this close to a wall
/// beyond half the initial distance.
const WALL_SLACK: f64 = 0.1;

/// Cell types for `count` cells following the normalized proportions,
/// shuffled. Rounding leftovers go to the first types.
pub fn assign_types<R: Rng>(count: usize, proportions: &[f64], rng: &mut R) -> Vec<CellType> {
    let mut types: Vec<CellType> = proportions
        .iter()
        .enumerate()
        .flat_map(|(t, p)| std::iter::repeat(t).take((p * count as f64).floor() as usize))
        .collect();
    let mut filler = (0..proportions.len()).cycle();
    while types.len() < count {
        types.push(filler.next().unwrap_or(0));
    }
    types.truncate(count);
    types.shuffle(rng);
    types
}

/// Sites of a hexagonal lattice, walked ring by ring from the origin.
#[derive(Debug, Clone)]
pub struct HexSpiral {
    spacing: f64,
    layer: usize,
    side: usize,
    along: usize,
    cursor: Vec2,
}

impl HexSpiral {
    #[must_use]
    pub fn new(spacing: f64) -> Self {
        Self {
            spacing,
            layer: 0,
            side: 0,
            along: 0,
            cursor: Vec2::ZERO,
        }
    }

    #[must_use]
    pub fn layer(&self) -> usize {
        self.layer
    }

    fn edge(side: usize) -> Vec2 {
        Vec2::from_angle(FRAC_PI_3 * side as f64)
    }
}

impl Iterator for HexSpiral {
    type Item = Vec2;

    fn next(&mut self) -> Option<Vec2> {
        if self.layer == 0 {
            self.layer = 1;
            self.cursor = Self::edge(4) * self.spacing;
            return Some(Vec2::ZERO);
        }
        let site = self.cursor;
        self.cursor += Self::edge(self.side) * self.spacing;
        self.along += 1;
        if self.along == self.layer {
            self.along = 0;
            self.side += 1;
            if self.side == 6 {
                self.side = 0;
                self.layer += 1;
                self.cursor = Self::edge(4) * (self.spacing * self.layer as f64);
            }
        }
        Some(site)
    }
}

/// Whether a nucleus may start at `position`.
#[must_use]
pub fn site_is_free(position: Vec2, cell_type: CellType, settings: &Settings) -> bool {
    let spacing = settings.params.domain.initial_distance;
    let half_range = 0.5 * settings.domain();
    let walled = settings.params.domain.boundary.is_walled();
    for dim in 0..2 {
        let c = position.axis(dim).abs();
        if half_range - c < 0.5 * spacing - settings.tolerance() {
            return false;
        }
        if walled && 0.5 * settings.derived.rectangle[dim] - c < 0.5 * spacing - WALL_SLACK {
            return false;
        }
    }
    if settings.params.domain.boundary == BoundaryCondition::Stokes {
        let reach = settings.params.mechanics.radial_eq[cell_type] - WALL_SLACK;
        return settings.params.domain.holes.iter().all(|hole| {
            Displacement::between(hole.center, position, settings.domain()).module >= hole.radius + reach
        });
    }
    true
}

fn jitter<R: Rng>(radius: f64, rng: &mut R) -> Vec2 {
    let r = radius * rng.gen_range(0.0..1.0f64).sqrt();
    Vec2::from_angle(rng.gen_range(0.0..TAU)) * r
}

/// Nucleus positions for every type in `types`, in order.
pub fn nucleus_sites<R: Rng>(types: &[CellType], settings: &Settings, rng: &mut R) -> Result<Vec<Vec2>> {
    let spacing = settings.params.domain.initial_distance;
    let limit = settings.domain();
    let mut sites = Vec::with_capacity(types.len());
    match settings.params.domain.initial {
        InitialCondition::HexCenter => {
            let mut spiral = HexSpiral::new(spacing);
            let noise = 0.5 * settings.core_diameter();
            for &t in types {
                let site = loop {
                    let candidate = spiral
                        .next()
                        .filter(|_| spiral.layer() as f64 * spacing <= limit)
                        .ok_or_else(|| EngineError::placement("Hexagonal spiral left the domain"))?;
                    let candidate = candidate + jitter(noise, rng);
                    if site_is_free(candidate, t, settings) {
                        break candidate;
                    }
                };
                sites.push(site);
            }
        }
        InitialCondition::LeftEdge => {
            let [rx, ry] = settings.derived.rectangle;
            let per_column = ((ry / spacing).floor() as usize).max(1);
            let mut count = 0usize;
            for &t in types {
                let site = loop {
                    let column = count / per_column;
                    let row = count % per_column;
                    count += 1;
                    let candidate = Vec2::new(
                        (column as f64 + 0.5) * spacing - 0.5 * rx,
                        (row as f64 + 0.5) * spacing - 0.5 * ry,
                    );
                    if candidate.x > 0.5 * rx {
                        return Err(EngineError::placement("Left-edge columns filled the rectangle"));
                    }
                    if site_is_free(candidate, t, settings) {
                        break candidate;
                    }
                };
                sites.push(site);
            }
        }
    }
    Ok(sites)
}

/// Activates the first `params.cells.cells` slots at generated sites.
///
/// Cells whose ring overlaps a hole are left dead. Returns how many were
/// removed that way.
pub fn place_population<R: Rng>(
    cells: &mut [Cell],
    grid: &mut SpatialGrid,
    rng: &mut R,
    settings: &Settings,
) -> Result<usize> {
    let count = settings.params.cells.cells;
    let types = assign_types(count, &settings.derived.proportions, rng);
    let sites = nucleus_sites(&types, settings, rng)?;
    let mut killed = 0;
    for ((cell, &t), site) in cells.iter_mut().zip(&types).zip(sites) {
        cell.activate(t);
        let heading = Vec2::from_angle(cell.random_angle()) * settings.speed(t);
        let radius = 0.5 * settings.params.mechanics.radial_eq[t];
        cell.arrange(site, radius, heading, settings);
        if cell.particles.iter().any(|p| inside_any_hole(p.position, settings)) {
            tracing::warn!(cell = cell.id, "Cell placed inside a hole; removing it");
            cell.flag_for_death("placed inside a hole");
            cell.deactivate(grid);
            killed += 1;
            continue;
        }
        cell.register(grid);
    }
    Ok(killed)
}

/// Activates one slot per loaded cell with the recorded particles.
pub fn apply_initial_state(
    cells: &mut [Cell],
    grid: &mut SpatialGrid,
    state: &InitialState,
    settings: &Settings,
) -> Result<usize> {
    if state.cells.len() > cells.len() {
        return Err(EngineError::initial_state(format!(
            "{} cells loaded but the pool holds {}",
            state.cells.len(),
            cells.len()
        )));
    }
    let n = settings.particles_per_cell();
    let half = 0.5 * settings.domain();
    let mut killed = 0;
    for (cell, loaded) in cells.iter_mut().zip(&state.cells) {
        if loaded.particles.len() != n {
            return Err(EngineError::initial_state(format!(
                "cell {} has {} particles, expected {n}",
                cell.id,
                loaded.particles.len()
            )));
        }
        if loaded.cell_type >= settings.params.cells.types {
            return Err(EngineError::initial_state(format!(
                "cell {} has unknown type {}",
                cell.id, loaded.cell_type
            )));
        }
        cell.activate(loaded.cell_type);
        for (particle, record) in cell.particles.iter_mut().zip(&loaded.particles) {
            if !record.position.is_finite() || !record.velocity.is_finite() {
                return Err(EngineError::initial_state(format!(
                    "cell {} has a non-finite particle",
                    cell.id
                )));
            }
            particle.position = Vec2::new(
                wrap_coordinate(record.position.x, half),
                wrap_coordinate(record.position.y, half),
            );
            particle.velocity = record.velocity;
            particle.new_velocity = record.velocity;
        }
        if cell.particles.iter().any(|p| inside_any_hole(p.position, settings)) {
            cell.deactivate(grid);
            killed += 1;
            continue;
        }
        cell.register(grid);
    }
    Ok(killed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HoleConfig, Parameters};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use superboids_data::{InitialCell, ParticleRecord};

    fn pool(settings: &Settings) -> Vec<Cell> {
        (0..settings.capacity())
            .map(|id| Cell::new(id as u32, settings.particles_per_cell(), settings.derived.twist_eq_angle, 2))
            .collect()
    }

    #[test]
    fn test_types_follow_proportions() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let types = assign_types(10, &[0.3, 0.7], &mut rng);
        assert_eq!(types.len(), 10);
        assert_eq!(types.iter().filter(|&&t| t == 0).count(), 3);
        assert_eq!(types.iter().filter(|&&t| t == 1).count(), 7);
        let odd = assign_types(7, &[0.5, 0.5], &mut rng);
        assert_eq!(odd.len(), 7);
    }

    #[test]
    fn test_hex_spiral_rings() {
        let sites: Vec<Vec2> = HexSpiral::new(2.0).take(19).collect();
        assert_eq!(sites[0], Vec2::ZERO);
        for site in &sites[1..7] {
            assert!((site.norm() - 2.0).abs() < 1e-9);
        }
        for (i, a) in sites.iter().enumerate() {
            for b in &sites[i + 1..] {
                assert!((*a - *b).norm() > 2.0 - 1e-9);
            }
        }
        assert!(sites[7..].iter().all(|s| s.norm() > 3.0 && s.norm() < 4.0 + 1e-9));
    }

    #[test]
    fn test_place_population_registers_cells() {
        let settings = Settings::new(Parameters::default()).unwrap();
        let mut grid = SpatialGrid::new(settings.domain(), settings.derived.boxes_in_edge);
        let mut cells = pool(&settings);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let killed = place_population(&mut cells, &mut grid, &mut rng, &settings).unwrap();
        assert_eq!(killed, 0);
        assert!(cells.iter().all(Cell::is_live));
        assert_eq!(grid.occupant_count(), 7 * 12);
        let speed = settings.speed(0);
        assert!((cells[3].particles[5].velocity.norm() - speed).abs() < 1e-12);
    }

    #[test]
    fn test_left_edge_columns() {
        let mut params = Parameters::default();
        params.domain.boundary = BoundaryCondition::Rectangle;
        params.domain.rectangle = Some([20.0, 6.0]);
        params.domain.initial = InitialCondition::LeftEdge;
        let settings = Settings::new(params).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let sites = nucleus_sites(&[0; 4], &settings, &mut rng).unwrap();
        assert_eq!(sites[0], Vec2::new(-9.0, -2.0));
        assert_eq!(sites[2], Vec2::new(-9.0, 2.0));
        assert_eq!(sites[3], Vec2::new(-7.0, -2.0));
    }

    #[test]
    fn test_hole_sites_are_skipped() {
        let mut params = Parameters::default();
        params.domain.boundary = BoundaryCondition::Stokes;
        params.domain.rectangle = Some([40.0, 40.0]);
        params.domain.holes = vec![HoleConfig {
            center: Vec2::ZERO,
            radius: 3.0,
        }];
        let settings = Settings::new(params).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let sites = nucleus_sites(&[0; 7], &settings, &mut rng).unwrap();
        assert!(sites.iter().all(|s| s.norm() >= 3.9 - 0.2));
    }

    #[test]
    fn test_apply_initial_state_rejects_bad_rings() {
        let settings = Settings::new(Parameters::default()).unwrap();
        let mut grid = SpatialGrid::new(settings.domain(), settings.derived.boxes_in_edge);
        let mut cells = pool(&settings);
        let record = ParticleRecord {
            position: Vec2::new(1.0, 1.0),
            velocity: Vec2::ZERO,
        };
        let short = InitialState {
            start_step: 0,
            cells: vec![InitialCell {
                cell_type: 0,
                particles: vec![record; 5],
            }],
        };
        assert!(apply_initial_state(&mut cells, &mut grid, &short, &settings).is_err());

        let good = InitialState {
            start_step: 3,
            cells: vec![InitialCell {
                cell_type: 0,
                particles: vec![record; 12],
            }],
        };
        assert_eq!(apply_initial_state(&mut cells, &mut grid, &good, &settings).unwrap(), 0);
        assert!(cells[0].is_live());
        assert!(!cells[1].is_active());
        assert_eq!(grid.occupant_count(), 12);
    }
}
