//! Per-cell velocity and position updates.
//!
//! Each particle sums noise, velocity alignment and forces, then moves at
//! its type's fixed speed along the sum (self-propelled particles). Forces:
//!
//! - nucleus: radial springs from every cortex particle;
//! - cortex: radial spring to the nucleus, twist torque plus tangent spring
//!   to both ring neighbors, inter-cell springs and invasion expulsion;
//! - anywhere: the hard core below `core_diameter`, which replaces the
//!   elastic law instead of adding to it.

use crate::boundary::{enforce_limits, kill_verdict};
use crate::cell::Cell;
use crate::config::Settings;
use crate::forces::{hard_core, harris_parameter, SpringLaw};
use crate::geometry::{angle_between, wrap_angle, Displacement};
use crate::invasion::{invading_segment, outward_normal, snapped_position, INVASION_FORCE_FACTOR};
use crate::view::PopulationView;
use std::f64::consts::TAU;
use superboids_data::{CellId, ForceVector, Vec2};

/// Sums shorter than this leave the velocity unchanged.
pub const NEAR_ZERO: f64 = 1.0e-9;

struct CellLaws {
    radial: SpringLaw,
    tangent: SpringLaw,
}

fn laws_at(cell: &Cell, step: u64, settings: &Settings) -> CellLaws {
    let t = cell.cell_type;
    CellLaws {
        radial: SpringLaw {
            req: cell.radial_req(step, settings),
            ..settings.derived.radial_law[t]
        },
        tangent: SpringLaw {
            req: cell.tangent_req(step, settings),
            ..settings.derived.tangent_law[t]
        },
    }
}

/// Computes `new_velocity` of every real particle of `cell`.
///
/// Reads neighbor lists filled by the search phase and foreign polygons
/// from `view`; writes only to `cell`.
pub fn update_velocities(cell: &mut Cell, step: u64, view: &PopulationView, settings: &Settings) {
    let n = cell.particles.len();
    let t = cell.cell_type;
    let m = &settings.params.mechanics;
    let types = settings.params.cells.types;
    let expected = settings.derived.harris_amount[t];
    let domain = settings.domain();
    let core = m.core_diameter;
    let intensity = m.core_intensity;
    let speed = settings.speed(t);
    let laws = laws_at(cell, step, settings);

    let counts: Vec<Vec<usize>> = cell.particles.iter().map(|p| p.type_counts(types)).collect();
    let harris = |row: &[Vec<f64>], medium: &[f64]| -> Vec<f64> {
        counts
            .iter()
            .map(|c| harris_parameter(&row[t], medium[t], c, expected))
            .collect()
    };
    let radial_beta = harris(&m.radial_beta, &m.radial_beta_medium);
    let tangent_beta = harris(&m.tangent_beta, &m.tangent_beta_medium);
    let kapa = harris(&m.kapa, &m.kapa_medium);

    let radials: Vec<Displacement> = cell.particles.iter().map(|p| p.radial).collect();
    let own_alignment = cell
        .particles
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.velocity)
        * m.auto_alpha[t];
    let noise: Vec<Vec2> = (0..n)
        .map(|_| Vec2::from_angle(cell.random_angle()) * m.eta)
        .collect();

    let mut hard_core_vectors = Vec::new();
    let mut invasion_vectors = Vec::new();

    for (i, particle) in cell.particles.iter_mut().enumerate() {
        let mut force = Vec2::ZERO;
        let mut alignment = own_alignment;

        if i == 0 {
            for (j, radial) in radials.iter().enumerate().skip(1) {
                force += if radial.module <= core {
                    radial.direction() * intensity
                } else {
                    radial.direction() * (radial_beta[j] * laws.radial.scalar(radial.module))
                };
            }
        } else {
            particle.prune_invasion_memory(step);
            let mut invasions: Vec<(CellId, (usize, usize))> = Vec::new();

            for list in &particle.neighbors {
                for neighbor in &list.members {
                    let other = neighbor.cell_type;
                    if !neighbor.key.is_virtual {
                        alignment += neighbor.velocity * m.inter_alpha[t][other];
                    }
                    let d = neighbor.distance;
                    if d.module <= core {
                        let push = hard_core(d.direction(), intensity);
                        force += push;
                        hard_core_vectors.push(ForceVector {
                            origin: particle.position,
                            direction: push,
                        });
                    } else {
                        force += settings.derived.inter_law[t][other].force(
                            d.module,
                            d.direction(),
                            m.inter_beta[t][other],
                        );
                    }
                }

                let Some(foreign) = view.get(list.cell) else {
                    continue;
                };
                if let Some(found) = invading_segment(particle.position, &foreign.positions, domain) {
                    let segment = particle.remembered_segment(list.cell).unwrap_or(found);
                    let outward = outward_normal(&foreign.positions, segment, domain);
                    let push = (outward + particle.radial.direction()) * (INVASION_FORCE_FACTOR * intensity);
                    force += push;
                    invasion_vectors.push(ForceVector {
                        origin: particle.position,
                        direction: push,
                    });
                    invasions.push((list.cell, segment));
                }
            }

            particle.invasion_counter = if invasions.is_empty() {
                0
            } else {
                particle.invasion_counter + 1
            };
            for (foreign, segment) in invasions {
                particle.remember_invasion(foreign, step, segment);
            }

            let radial = particle.radial;
            force += if radial.module <= core {
                hard_core(radial.direction(), intensity)
            } else {
                laws.radial.force(radial.module, radial.direction(), radial_beta[i])
            };

            let tangent = radial.tangent();
            for link in &particle.twist {
                let j = link.neighbor;
                let gap = link.distance;
                if gap.module <= core {
                    force += tangent * (link.eq_angle.signum() * intensity);
                    continue;
                }
                let stiffness = 0.5 * (kapa[i] + kapa[j]);
                let deviation = wrap_angle(angle_between(radial.angle(), radials[j].angle()) - link.eq_angle);
                force += tangent * (-stiffness * deviation * laws.radial.req);
                let along = tangent * gap.direction().dot(tangent);
                force += along * (-tangent_beta[i] * laws.tangent.scalar(gap.module));
            }
        }

        particle.noise_sum = noise[i];
        particle.velocity_sum = alignment;
        particle.force_sum = force;
        let total = noise[i] + alignment + force;
        let norm = total.norm();
        if norm > NEAR_ZERO {
            particle.new_velocity = total * (speed / norm);
        }
    }

    cell.hard_core_vectors = hard_core_vectors;
    cell.invasion_vectors = invasion_vectors;
}

/// Moves every real particle of `cell` and applies the boundary.
///
/// Returns the kill reason when the cell should be removed; the caller
/// only flags it, so removal waits for the next tick.
pub fn update_positions(cell: &mut Cell, step: u64, settings: &Settings) -> Option<String> {
    let t = cell.cell_type;
    let domain = settings.domain();
    let dt = settings.params.mechanics.dt;
    let core = settings.core_diameter();
    let max_step = settings.max_step(t);
    let req = cell.radial_req(step, settings);

    let shape = cell.set_shape(step, domain);
    let ring = cell.ring_len() as f64;
    let area_shift = if shape.mean_radius > 0.0 {
        (shape.area - settings.derived.target_area[t]) / (20.0 * TAU * shape.mean_radius * ring)
    } else {
        0.0
    };

    let mut crossed_right = false;
    for i in 0..cell.particles.len() {
        let nucleus = cell.particles[0].position;
        let particle = &mut cell.particles[i];
        particle.velocity = particle.new_velocity;
        let snapped = if i > 0 {
            snapped_position(particle.invasion_counter, nucleus, &particle.radial, core)
        } else {
            None
        };
        match snapped {
            Some(position) => particle.position = position,
            None => {
                particle.position += particle.velocity * dt;
                if i > 0 {
                    particle.position += particle.radial.direction() * area_shift;
                }
            }
        }
        crossed_right |= enforce_limits(particle, max_step, req, settings).crossed_right;
    }

    if step == 0 {
        return None;
    }
    cell.refresh_shape(step, domain);
    kill_verdict(cell, crossed_right, settings)
}
