//! Periodic-aware displacement between two points.
//!
//! Every distance in the engine goes through [`Displacement::between`], which
//! applies the minimum-image convention over the square domain regardless of
//! the boundary condition. Walls are enforced separately by the boundary
//! module, so a rectangle smaller than half the domain never sees the wrap.

use std::f64::consts::{PI, TAU};
use superboids_data::Vec2;

/// Below this length a displacement has no direction.
pub const DIRECTION_EPSILON: f64 = 1.0e-6;

/// Length plus unit direction from one point to another.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Displacement {
    pub module: f64,
    pub cos: f64,
    pub sin: f64,
}

impl Displacement {
    /// Displacement from `from` to `to` under the minimum-image convention.
    #[must_use]
    pub fn between(from: Vec2, to: Vec2, domain: f64) -> Self {
        Self::from_vector(minimum_image(to - from, domain))
    }

    #[must_use]
    pub fn from_vector(v: Vec2) -> Self {
        let module = v.norm();
        if module > DIRECTION_EPSILON {
            Self {
                module,
                cos: v.x / module,
                sin: v.y / module,
            }
        } else {
            Self {
                module,
                cos: 0.0,
                sin: 0.0,
            }
        }
    }

    /// Unit vector, or zero when the points coincide.
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        Vec2::new(self.cos, self.sin)
    }

    #[must_use]
    pub fn vector(&self) -> Vec2 {
        self.direction() * self.module
    }

    #[must_use]
    pub fn angle(&self) -> f64 {
        self.sin.atan2(self.cos)
    }

    /// Direction rotated a quarter turn counter-clockwise.
    #[must_use]
    pub fn tangent(&self) -> Vec2 {
        Vec2::new(-self.sin, self.cos)
    }

    #[must_use]
    pub fn has_direction(&self) -> bool {
        self.module > DIRECTION_EPSILON
    }
}

/// Shortest representative of `delta` on a torus of side `domain`.
#[must_use]
pub fn minimum_image(delta: Vec2, domain: f64) -> Vec2 {
    let half = 0.5 * domain;
    let mut out = delta;
    for dim in 0..2 {
        let c = out.axis_mut(dim);
        if c.abs() >= half {
            *c -= c.signum() * domain;
        }
    }
    out
}

/// Wraps a coordinate into `(-half, half]`.
#[must_use]
pub fn wrap_coordinate(c: f64, half: f64) -> f64 {
    let range = 2.0 * half;
    let mut w = (c + half).rem_euclid(range) - half;
    if w <= -half {
        w += range;
    }
    w
}

/// Wraps an angle into `[-pi, pi)`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Signed smallest rotation from `phi1` to `phi2`.
#[must_use]
pub fn angle_between(phi1: f64, phi2: f64) -> f64 {
    wrap_angle(phi2 - phi1)
}

/// Point at `portion` of the way along `d` starting from `origin`.
#[must_use]
pub fn point_along(origin: Vec2, d: &Displacement, portion: f64) -> Vec2 {
    origin + d.direction() * (d.module * portion)
}
