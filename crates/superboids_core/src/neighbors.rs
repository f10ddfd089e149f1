//! Neighbor search and neighbor-sanity repair.
//!
//! Both run in parallel, one call per cell, against a grid that no phase
//! mutates at the same time. A search also learns which foreign cells can
//! see this one; those sightings are returned and merged into the foreign
//! cells' contact sets after the barrier instead of being written across
//! partitions.

use crate::cell::Cell;
use crate::config::Settings;
use crate::geometry::{point_along, Displacement};
use crate::grid::SpatialGrid;
use crate::invasion::inside_first_fan;
use crate::particle::Neighbor;
use crate::view::PopulationView;
use std::collections::BTreeSet;
use superboids_data::CellId;

/// Fractions of the nucleus-to-nucleus segment probed for occlusion.
pub const OCCLUSION_PORTIONS: [f64; 7] = [0.5, 0.53, 0.47, 0.56, 0.44, 0.6, 0.4];

/// Foreign cells found by one cell's search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactReport {
    pub cell: CellId,
    pub seen: Vec<CellId>,
}

/// Rebuilds the neighbor lists of every real cortex particle of `cell`.
///
/// Foreign nuclei are never candidates. Virtual particles of other cells
/// are.
pub fn search_cell(
    cell: &mut Cell,
    grid: &SpatialGrid,
    view: &PopulationView,
    settings: &Settings,
) -> ContactReport {
    let domain = settings.domain();
    let cutoff = settings.params.domain.neighbor_distance;
    let own = cell.id;
    let mut seen = BTreeSet::new();

    for particle in cell.particles.iter_mut().skip(1) {
        let home = particle
            .grid_box
            .unwrap_or_else(|| grid.box_index_of(particle.position));
        for &b in grid.neighbors_of(home) {
            for &key in grid.occupants(b) {
                if key.cell == own || key.is_nucleus() {
                    continue;
                }
                let (Some(other), Some(position)) = (view.get(key.cell), view.position(key)) else {
                    continue;
                };
                let distance = Displacement::between(particle.position, position, domain);
                if distance.module <= cutoff {
                    seen.insert(key.cell);
                    particle.add_neighbor(
                        key.cell,
                        Neighbor {
                            key,
                            cell_type: other.cell_type,
                            velocity: view.velocity(key),
                            distance,
                        },
                    );
                }
            }
        }
    }

    cell.contacts.extend(seen.iter().copied());
    ContactReport {
        cell: own,
        seen: seen.into_iter().collect(),
    }
}

/// Adds each reporting cell to the contact set of every cell it saw.
pub fn merge_contacts(cells: &mut [Cell], reports: &[ContactReport]) {
    for report in reports {
        for &other in &report.seen {
            if let Some(target) = cells.get_mut(other as usize) {
                if target.is_active() {
                    target.contacts.insert(report.cell);
                }
            }
        }
    }
}

/// Drops contacts hidden behind a third cell.
///
/// A contact is occluded when a probe point on the segment between the two
/// nuclei falls inside the first fan of another contact. Returns the
/// dropped ids.
pub fn repair_cell(cell: &mut Cell, view: &PopulationView, settings: &Settings) -> Vec<CellId> {
    let domain = settings.domain();
    let origin = cell.nucleus_position();
    let contacts: Vec<CellId> = cell.contacts.iter().copied().collect();
    let mut dropped = Vec::new();

    for &target in &contacts {
        let Some(target_view) = view.get(target) else {
            continue;
        };
        let Some(&target_nucleus) = target_view.positions.first() else {
            continue;
        };
        let segment = Displacement::between(origin, target_nucleus, domain);
        let occluded = contacts
            .iter()
            .filter(|&&blocker| blocker != target)
            .filter_map(|&blocker| view.get(blocker))
            .any(|blocker| {
                OCCLUSION_PORTIONS.iter().any(|&portion| {
                    inside_first_fan(point_along(origin, &segment, portion), &blocker.positions, domain)
                })
            });
        if occluded {
            dropped.push(target);
        }
    }

    for &target in &dropped {
        cell.contacts.remove(&target);
        for particle in &mut cell.particles {
            particle.forget_cell(target);
        }
    }
    if !dropped.is_empty() {
        tracing::debug!(cell = cell.id, dropped = ?dropped, "Dropped occluded contacts");
    }
    dropped
}

/// Fraction of contacts of a different type; `None` without contacts.
#[must_use]
pub fn segregation(cell: &Cell, view: &PopulationView) -> Option<f64> {
    let types: Vec<_> = cell
        .contacts
        .iter()
        .filter_map(|&id| view.cell_type(id))
        .collect();
    if types.is_empty() {
        return None;
    }
    let other = types.iter().filter(|&&t| t != cell.cell_type).count();
    Some(other as f64 / types.len() as f64)
}
