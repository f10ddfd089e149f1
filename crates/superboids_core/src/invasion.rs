//! Triangle-fan intrusion test.
//!
//! A cell's interior is covered by the fan of triangles
//! `(nucleus, cortex r, cortex r + nth)`. The first fan (`nth = 1`) follows
//! the polygon edges; the second (`nth = 2`) spans two edges and catches
//! points hidden behind a concave vertex.

use crate::geometry::Displacement;
use crate::particle::ring_offset;
use superboids_data::Vec2;

/// Fan orders checked by [`invading_segment`].
pub const FAN_ORDERS: [usize; 2] = [1, 2];

/// Multiplier of the core intensity applied to an intruder.
pub const INVASION_FORCE_FACTOR: f64 = 0.9;

/// Invasion-counter thresholds past which a particle is snapped back.
pub const SNAP_THRESHOLDS: [u32; 3] = [5, 10, 15];

fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Whether `point` lies in triangle `(a, b, c)`, edges included.
///
/// All vertices are taken relative to `a` through periodic displacements,
/// so triangles straddling the seam work. Degenerate triangles contain
/// nothing.
#[must_use]
pub fn point_in_triangle(point: Vec2, a: Vec2, b: Vec2, c: Vec2, domain: f64) -> bool {
    let ab = Displacement::between(a, b, domain).vector();
    let ac = Displacement::between(a, c, domain).vector();
    let ap = Displacement::between(a, point, domain).vector();

    let area = cross(ab, ac);
    if area.abs() <= f64::EPSILON {
        return false;
    }
    let d1 = cross(ab, ap);
    let d2 = cross(ac - ab, ap - ab);
    let d3 = cross(-ac, ap - ac);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Ring segment `(r, r + nth)` whose fan triangle contains `point`.
///
/// `positions` holds the nucleus at index 0 followed by the cortex ring.
#[must_use]
pub fn fan_segment_containing(
    point: Vec2,
    positions: &[Vec2],
    nth: usize,
    domain: f64,
) -> Option<(usize, usize)> {
    let n = positions.len();
    if n < 4 {
        return None;
    }
    let nucleus = positions[0];
    (1..n).find_map(|r| {
        let aux = ring_offset(r, nth, n);
        point_in_triangle(point, nucleus, positions[r], positions[aux], domain).then_some((r, aux))
    })
}

/// First segment of any fan order that hides `point` inside the cell.
#[must_use]
pub fn invading_segment(point: Vec2, positions: &[Vec2], domain: f64) -> Option<(usize, usize)> {
    FAN_ORDERS
        .iter()
        .find_map(|&nth| fan_segment_containing(point, positions, nth, domain))
}

/// Whether `point` is inside the first fan of the cell.
#[must_use]
pub fn inside_first_fan(point: Vec2, positions: &[Vec2], domain: f64) -> bool {
    fan_segment_containing(point, positions, 1, domain).is_some()
}

/// Unit normal of segment `(r, aux)` pointing away from the nucleus.
#[must_use]
pub fn outward_normal(positions: &[Vec2], segment: (usize, usize), domain: f64) -> Vec2 {
    let (r, aux) = segment;
    let edge = Displacement::between(positions[r], positions[aux], domain);
    let normal = edge.tangent();
    let midpoint = positions[r] + edge.vector() * 0.5;
    let from_nucleus = Displacement::between(positions[0], midpoint, domain).vector();
    if normal.dot(from_nucleus) < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Position an invaded particle snaps to, if its counter passed a threshold.
///
/// `radial` runs from the particle to its own nucleus.
#[must_use]
pub fn snapped_position(
    counter: u32,
    nucleus: Vec2,
    radial: &Displacement,
    core_diameter: f64,
) -> Option<Vec2> {
    let [low, mid, high] = SNAP_THRESHOLDS;
    let distance = if counter > high {
        1.1 * core_diameter
    } else if counter > mid {
        2.0 * core_diameter
    } else if counter > low {
        0.5 * radial.module
    } else {
        return None;
    };
    Some(nucleus - radial.direction() * distance)
}
