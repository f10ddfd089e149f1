//! Scratch particles that plug gaps in a stretched cortex ring.

use crate::boundary::enforce_limits;
use crate::cell::Cell;
use crate::config::Settings;
use crate::grid::SpatialGrid;
use crate::particle::Particle;
use std::f64::consts::TAU;
use superboids_data::ParticleKey;

/// Longest ring edge tolerated before filling: twice the chord of a regular
/// ring of radius `radial_req`.
#[must_use]
pub fn max_gap(radial_req: f64, ring: usize) -> f64 {
    2.0 * radial_req * (2.0 * (1.0 - (TAU / ring as f64).cos())).sqrt()
}

/// Fills every over-long edge between a cortex particle and its previous
/// ring neighbor with evenly spaced virtual particles.
///
/// Relies on the twist displacements refreshed by the reset phase. Replaces
/// any virtuals left in the cell; the caller registers them in the grid.
pub fn insert_virtuals(cell: &mut Cell, step: u64, settings: &Settings) -> usize {
    let n = cell.particles.len();
    let req = cell.radial_req(step, settings);
    let limit = max_gap(req, n - 1);
    let max_step = settings.max_step(cell.cell_type);
    let nucleus = cell.nucleus_position();
    let domain = settings.domain();

    let mut created: Vec<Particle> = Vec::new();
    for particle in cell.particles.iter().skip(1) {
        let Some(link) = particle.twist.first() else {
            continue;
        };
        let gap = link.distance;
        if gap.module <= limit {
            continue;
        }
        let count = (gap.module / limit).floor() as usize;
        for k in 0..count {
            let along = (k + 1) as f64 * gap.module / (count + 1) as f64;
            let mut scratch = Particle::new(
                ParticleKey::virtual_at(cell.id, created.len()),
                particle.position + gap.direction() * along,
            );
            enforce_limits(&mut scratch, max_step, req, settings);
            scratch.set_radial(nucleus, domain);
            created.push(scratch);
        }
    }

    let count = created.len();
    cell.virtuals = created;
    count
}

/// Registers a cell's virtual particles; single-threaded.
pub fn register_virtuals(cell: &mut Cell, grid: &mut SpatialGrid) {
    for scratch in &mut cell.virtuals {
        let id = grid.box_index_of(scratch.position);
        grid.append(id, scratch.key);
        scratch.grid_box = Some(id);
    }
}
