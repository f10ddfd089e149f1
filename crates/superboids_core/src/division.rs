//! Cell division.
//!
//! A round draws one eligible live cell and splits it into itself plus a
//! daughter taken from the pool of dead slots. The daughter's type is drawn
//! uniformly from all configured types. Each attempt only plans the
//! two new polygons; they are checked against the walls, the holes and every
//! nearby cell before anything is written, so a rejected attempt leaves the
//! population and the grid untouched. Runs single-threaded between phases.

use crate::boundary::{inside_any_hole, inside_domain};
use crate::cell::Cell;
use crate::config::Settings;
use crate::geometry::{wrap_coordinate, Displacement};
use crate::grid::SpatialGrid;
use crate::invasion::invading_segment;
use rand::Rng;
use std::f64::consts::TAU;
use superboids_data::{CellId, DeathState, Vec2};

/// What a division round did.
#[derive(Debug, Clone, PartialEq)]
pub enum DivisionOutcome {
    /// Not a division tick, or division is disabled.
    NotDue,
    /// No eligible cell passed the shape filter.
    NoCandidate,
    /// Every slot of the pool is in use.
    PoolFull { mother: CellId },
    /// Every attempt conflicted; the daughter went back to the pool.
    Exhausted { mother: CellId, daughter: CellId },
    Divided {
        mother: CellId,
        daughter: CellId,
        attempts: u32,
    },
}

impl DivisionOutcome {
    #[must_use]
    pub fn divided(&self) -> bool {
        matches!(self, Self::Divided { .. })
    }
}

/// Division rounds fire on the last tick of every interval.
#[must_use]
pub fn is_due(step: u64, settings: &Settings) -> bool {
    let interval = settings.params.division.interval;
    interval > 0 && step % interval == interval - 1
}

/// Live cells past their cooldown whose nucleus lies in the division region.
#[must_use]
pub fn eligible_cells(cells: &[Cell], step: u64, settings: &Settings) -> Vec<CellId> {
    let division = &settings.params.division;
    cells
        .iter()
        .filter(|c| c.is_live())
        .filter(|c| {
            c.last_division_step
                .map_or(true, |last| step.saturating_sub(last) >= division.cooldown)
        })
        .filter(|c| division.region_x.map_or(true, |x| c.nucleus_position().x < x))
        .map(|c| c.id)
        .collect()
}

/// Draws a cell from `eligible`, excluding drawn cells too deformed to
/// divide, for at most `max_draws` draws.
pub fn select_candidate<R: Rng>(
    eligible: &mut Vec<CellId>,
    cells: &[Cell],
    rng: &mut R,
    settings: &Settings,
) -> Option<CellId> {
    let tolerable = settings.params.division.tolerable_p0;
    for _ in 0..settings.params.division.max_draws {
        if eligible.is_empty() {
            return None;
        }
        let slot = rng.gen_range(0..eligible.len());
        let id = eligible[slot];
        if cells[id as usize].shape_index() <= tolerable {
            return Some(id);
        }
        eligible.swap_remove(slot);
    }
    None
}

/// Runs one division round if the tick calls for it.
pub fn division_round<R: Rng>(
    cells: &mut [Cell],
    grid: &mut SpatialGrid,
    step: u64,
    rng: &mut R,
    settings: &Settings,
) -> DivisionOutcome {
    if !is_due(step, settings) {
        return DivisionOutcome::NotDue;
    }
    let mut eligible = eligible_cells(cells, step, settings);
    match select_candidate(&mut eligible, cells, rng, settings) {
        Some(mother) => divide(cells, grid, mother, step, rng, settings),
        None => DivisionOutcome::NoCandidate,
    }
}

/// Mutable references to two distinct slots.
fn pair_mut(cells: &mut [Cell], a: usize, b: usize) -> (&mut Cell, &mut Cell) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = cells.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = cells.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Nucleus followed by an evenly paced cortex ring.
fn ring_positions(nucleus: Vec2, radius: f64, n: usize, phase: f64, domain: f64) -> Vec<Vec2> {
    let half = 0.5 * domain;
    let delta = TAU / (n - 1) as f64;
    std::iter::once(nucleus)
        .chain((1..n).map(|i| nucleus + Vec2::from_angle(phase + delta * (i - 1) as f64) * radius))
        .map(|p| Vec2::new(wrap_coordinate(p.x, half), wrap_coordinate(p.y, half)))
        .collect()
}

fn polygons_overlap(a: &[Vec2], b: &[Vec2], domain: f64) -> bool {
    a.iter().any(|&p| invading_segment(p, b, domain).is_some())
        || b.iter().any(|&p| invading_segment(p, a, domain).is_some())
}

fn plan_is_clear(
    planned: &[Vec<Vec2>; 2],
    cells: &[Cell],
    skip: [usize; 2],
    reach: f64,
    settings: &Settings,
) -> bool {
    let domain = settings.domain();
    let walled = settings.params.domain.boundary.is_walled();
    for polygon in planned {
        if polygon
            .iter()
            .any(|&p| (walled && !inside_domain(p, settings)) || inside_any_hole(p, settings))
        {
            return false;
        }
    }
    if polygons_overlap(&planned[0], &planned[1], domain) {
        return false;
    }
    let center = planned[0][0];
    cells
        .iter()
        .filter(|c| c.is_active() && !skip.contains(&(c.id as usize)))
        .filter(|c| Displacement::between(center, c.nucleus_position(), domain).module <= reach)
        .all(|other| {
            let positions = other.positions();
            planned.iter().all(|polygon| !polygons_overlap(polygon, &positions, domain))
        })
}

/// Splits `mother` into two cells, retrying with a smaller cortex radius
/// after each conflict.
///
/// Each nucleus moves by the division distance along a random axis, so the
/// two nuclei end up twice that distance apart.
pub fn divide<R: Rng>(
    cells: &mut [Cell],
    grid: &mut SpatialGrid,
    mother: CellId,
    step: u64,
    rng: &mut R,
    settings: &Settings,
) -> DivisionOutcome {
    let m = mother as usize;
    let Some(d) = cells.iter().position(|c| c.state == DeathState::Dead) else {
        tracing::warn!(mother, "Division skipped: cell pool is full");
        return DivisionOutcome::PoolFull { mother };
    };
    let daughter = d as CellId;
    let daughter_type = rng.gen_range(0..settings.params.cells.types.max(1));

    {
        let (source, target) = pair_mut(cells, m, d);
        target.activate(daughter_type);
        for (to, from) in target.particles.iter_mut().zip(&source.particles) {
            to.position = from.position;
            to.velocity = from.velocity;
            to.new_velocity = from.new_velocity;
        }
        target.shape = source.shape;
    }

    let division = &settings.params.division;
    let domain = settings.domain();
    let core = settings.core_diameter();
    let n = settings.particles_per_cell();
    let distance = settings.derived.division_distance;
    let reach = 4.0 * settings.params.mechanics.radial_eq.iter().copied().fold(distance, f64::max)
        + settings.params.domain.neighbor_distance;

    for attempt in 0..division.max_attempts {
        let axis = cells[m].random_angle();
        let direction = Vec2::from_angle(axis);
        let center = cells[m].nucleus_position();
        let offset = direction * distance;
        let radius = ((distance - 2.0 * core) * division.shrink_factor.powi(attempt as i32)).max(core)
            + settings.tolerance();
        let planned = [
            ring_positions(center + offset, radius, n, axis, domain),
            ring_positions(center - offset, radius, n, axis, domain),
        ];
        if !plan_is_clear(&planned, cells, [m, d], reach, settings) {
            continue;
        }

        let [mother_ring, daughter_ring] = planned;
        let (source, target) = pair_mut(cells, m, d);
        for (cell, ring) in [(source, mother_ring), (target, daughter_ring)] {
            cell.evict(grid);
            for (particle, position) in cell.particles.iter_mut().zip(ring) {
                particle.position = position;
                particle.invasion_counter = 0;
                particle.invasion_memory.clear();
            }
            cell.register(grid);
            cell.last_division_step = Some(step);
            cell.refresh_geometry(domain);
            cell.refresh_shape(step, domain);
        }
        tracing::debug!(mother, daughter, attempts = attempt + 1, step, "Cell divided");
        return DivisionOutcome::Divided {
            mother,
            daughter,
            attempts: attempt + 1,
        };
    }

    cells[d].deactivate(grid);
    tracing::debug!(mother, daughter, step, "Division abandoned after every attempt conflicted");
    DivisionOutcome::Exhausted { mother, daughter }
}
