//! Force-law primitives: the three-regime spring, the hard core and the
//! Harris stiffness estimate.

use superboids_data::Vec2;

/// Behavior of a spring over one distance interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Linear in distance.
    Elastic,
    /// Frozen at the value reached at plastic-begin.
    Plastic,
    /// Linear again, shifted by the width of the plastic window.
    ReElastic,
}

/// Elastic/plastic/re-elastic spring with equilibrium length `req`.
///
/// The scalar is positive under compression (`d < req`), so a force
/// `-scalar * direction_to_partner` pushes the partner away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringLaw {
    pub req: f64,
    pub plastic_begin: f64,
    pub plastic_end: f64,
}

impl SpringLaw {
    #[must_use]
    pub fn new(req: f64, plastic_begin: f64, plastic_end: f64) -> Self {
        Self {
            req,
            plastic_begin,
            plastic_end: plastic_end.max(plastic_begin),
        }
    }

    /// A law with no plastic window.
    #[must_use]
    pub fn elastic(req: f64) -> Self {
        Self::new(req, f64::INFINITY, f64::INFINITY)
    }

    /// Upper thresholds in increasing order, each closing one regime.
    fn regimes(&self) -> [(f64, Regime); 3] {
        [
            (self.plastic_begin, Regime::Elastic),
            (self.plastic_end, Regime::Plastic),
            (f64::INFINITY, Regime::ReElastic),
        ]
    }

    #[must_use]
    pub fn regime_at(&self, distance: f64) -> Regime {
        for (threshold, regime) in self.regimes() {
            if distance <= threshold {
                return regime;
            }
        }
        Regime::ReElastic
    }

    /// Dimensionless spring scalar at `distance`.
    #[must_use]
    pub fn scalar(&self, distance: f64) -> f64 {
        match self.regime_at(distance) {
            Regime::Elastic => 1.0 - distance / self.req,
            Regime::Plastic => 1.0 - self.plastic_begin / self.req,
            Regime::ReElastic => {
                1.0 - (distance - (self.plastic_end - self.plastic_begin)) / self.req
            }
        }
    }

    /// Finite force on the particle that sees its partner along `direction`.
    #[must_use]
    pub fn force(&self, distance: f64, direction: Vec2, beta: f64) -> Vec2 {
        direction * (-beta * self.scalar(distance))
    }
}

/// Fixed-magnitude repulsion away from a partner along `direction`.
#[must_use]
pub fn hard_core(direction: Vec2, intensity: f64) -> Vec2 {
    direction * -intensity
}

/// Stiffness blended from the types of a particle's neighbors.
///
/// `row` is the coefficient row of the particle's own type. With at least
/// `expected` neighbors the result is the mean coefficient over them;
/// otherwise the missing samples are filled with `medium`.
#[must_use]
pub fn harris_parameter(row: &[f64], medium: f64, counts: &[usize], expected: usize) -> f64 {
    let total: usize = counts.iter().sum();
    let observed: f64 = counts
        .iter()
        .zip(row)
        .map(|(&n, &coefficient)| n as f64 * coefficient)
        .sum();

    if total >= expected {
        if total == 0 {
            medium
        } else {
            observed / total as f64
        }
    } else {
        (observed + (expected - total) as f64 * medium) / expected as f64
    }
}
