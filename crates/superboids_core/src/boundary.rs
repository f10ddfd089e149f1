//! Boundary enforcement and kill checks.

use crate::cell::Cell;
use crate::config::{HoleConfig, Settings};
use crate::geometry::{wrap_coordinate, Displacement};
use crate::particle::Particle;
use superboids_data::{BoundaryCondition, Vec2};

/// What a limits pass observed before correcting the position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitReport {
    pub crossed_right: bool,
    pub reflected: bool,
    pub pushed_from_hole: bool,
}

/// Applies the boundary condition to one particle.
///
/// `radial_req` widens the exclusion radius of holes for nuclei, which sit
/// half a cell radius inside their cortex.
pub fn enforce_limits(particle: &mut Particle, max_step: f64, radial_req: f64, settings: &Settings) -> LimitReport {
    let mut report = LimitReport {
        crossed_right: particle.position.x > 0.5 * settings.derived.rectangle[0],
        ..LimitReport::default()
    };
    match settings.params.domain.boundary {
        BoundaryCondition::Periodic => {
            let half = 0.5 * settings.domain();
            particle.position = Vec2::new(
                wrap_coordinate(particle.position.x, half),
                wrap_coordinate(particle.position.y, half),
            );
        }
        BoundaryCondition::Rectangle => {
            report.reflected = reflect_walls(particle, max_step, settings);
        }
        BoundaryCondition::Stokes => {
            report.reflected = reflect_walls(particle, max_step, settings);
            let widen = if particle.is_nucleus() { 0.5 * radial_req } else { 0.0 };
            for hole in &settings.params.domain.holes {
                if push_out_of_hole(particle, hole, hole.radius + widen, max_step, settings.domain()) {
                    report.pushed_from_hole = true;
                }
            }
        }
    }
    report
}

fn reflect_walls(particle: &mut Particle, max_step: f64, settings: &Settings) -> bool {
    let tolerance = settings.tolerance();
    let mut reflected = false;
    for dim in 0..2 {
        let half = 0.5 * settings.derived.rectangle[dim];
        let c = particle.position.axis(dim);
        let corrected = if c < -half {
            let overshoot = -half - c;
            Some(if 2.0 * overshoot < max_step {
                -half + overshoot
            } else {
                -half + tolerance
            })
        } else if c > half {
            let overshoot = c - half;
            Some(if 2.0 * overshoot < max_step {
                half - overshoot
            } else {
                half - tolerance
            })
        } else {
            None
        };
        if let Some(value) = corrected {
            *particle.position.axis_mut(dim) = value;
            *particle.velocity.axis_mut(dim) *= -1.0;
            *particle.new_velocity.axis_mut(dim) *= -1.0;
            reflected = true;
        }
    }
    reflected
}

fn push_out_of_hole(particle: &mut Particle, hole: &HoleConfig, tolerable: f64, max_step: f64, domain: f64) -> bool {
    let d = Displacement::between(hole.center, particle.position, domain);
    if d.module >= tolerable {
        return false;
    }
    let direction = if d.has_direction() {
        d.direction()
    } else {
        Vec2::new(1.0, 0.0)
    };
    let depth = tolerable - d.module;
    particle.position = if 2.0 * depth < max_step {
        particle.position + direction * (2.0 * depth)
    } else {
        hole.center + direction * tolerable
    };
    true
}

/// Whether `position` lies inside any hole of the Stokes boundary.
#[must_use]
pub fn inside_any_hole(position: Vec2, settings: &Settings) -> bool {
    if settings.params.domain.boundary != BoundaryCondition::Stokes {
        return false;
    }
    let tolerance = settings.tolerance();
    settings.params.domain.holes.iter().any(|hole| {
        Displacement::between(hole.center, position, settings.domain()).module < hole.radius + tolerance
    })
}

/// Whether `position` is inside the walls (the whole domain when periodic).
#[must_use]
pub fn inside_domain(position: Vec2, settings: &Settings) -> bool {
    let [rx, ry] = settings.derived.rectangle;
    position.x.abs() <= 0.5 * rx && position.y.abs() <= 0.5 * ry
}

/// Reason to remove a cell under the configured kill condition.
#[must_use]
pub fn kill_verdict(cell: &Cell, crossed_right: bool, settings: &Settings) -> Option<String> {
    let kill = settings.params.domain.kill;
    if kill.checks_right_edge() && crossed_right {
        return Some(format!("cell {} crossed the right edge", cell.id));
    }
    if kill.checks_shape() {
        let index = cell.shape_index();
        if index > settings.params.domain.p0_limit {
            return Some(format!("cell {} shape index {index:.3} above limit", cell.id));
        }
    }
    None
}
