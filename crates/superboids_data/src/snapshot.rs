use crate::geometry::Vec2;
use crate::identity::{CellId, CellType};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct ParticleRecord {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// A force applied at a point, kept for diagnostics.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ForceVector {
    pub origin: Vec2,
    pub direction: Vec2,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CellRecord {
    pub id: CellId,
    pub cell_type: CellType,
    /// Nucleus first, then the cortex ring in order.
    pub particles: Vec<ParticleRecord>,
    pub area: f64,
    pub perimeter: f64,
    pub mean_radius: f64,
    pub mean_radius2: f64,
    pub contacts: Vec<CellId>,
    pub gamma: Option<f64>,
    pub hard_core_vectors: Vec<ForceVector>,
    pub invasion_vectors: Vec<ForceVector>,
}

impl CellRecord {
    /// Perimeter over the square root of the area; 2*sqrt(pi) for a circle.
    #[must_use]
    pub fn shape_index(&self) -> f64 {
        if self.area > 0.0 {
            self.perimeter / self.area.sqrt()
        } else {
            f64::INFINITY
        }
    }

    #[must_use]
    pub fn nucleus(&self) -> Option<&ParticleRecord> {
        self.particles.first()
    }
}

/// Read-only view of the live population at one step.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PopulationSnapshot {
    pub step: u64,
    pub domain: f64,
    pub types: usize,
    pub particles_per_cell: usize,
    pub speeds: Vec<f64>,
    pub cells: Vec<CellRecord>,
}

impl PopulationSnapshot {
    /// Polar order of nucleus headings: |sum v| / (cells * speed).
    #[must_use]
    pub fn order_parameter(&self) -> f64 {
        let mut sum = Vec2::ZERO;
        let mut norm = 0.0;
        for cell in &self.cells {
            if let Some(nucleus) = cell.nucleus() {
                let speed = self.speeds.get(cell.cell_type).copied().unwrap_or(1.0);
                if speed > 0.0 {
                    sum += nucleus.velocity / speed;
                    norm += 1.0;
                }
            }
        }
        if norm == 0.0 {
            0.0
        } else {
            (sum / norm).norm()
        }
    }

    /// Mean segregation metric over the cells of one type that reported it.
    #[must_use]
    pub fn mean_gamma(&self, cell_type: CellType) -> Option<f64> {
        let values: Vec<f64> = self
            .cells
            .iter()
            .filter(|c| c.cell_type == cell_type)
            .filter_map(|c| c.gamma)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One cell of an initial-state file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct InitialCell {
    pub cell_type: CellType,
    pub particles: Vec<ParticleRecord>,
}

/// Population supplied by a loader before step 0.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Default, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct InitialState {
    pub start_step: u64,
    pub cells: Vec<InitialCell>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cell_type: CellType, velocity: Vec2, gamma: Option<f64>) -> CellRecord {
        CellRecord {
            id: 0,
            cell_type,
            particles: vec![ParticleRecord {
                position: Vec2::ZERO,
                velocity,
            }],
            area: 1.0,
            perimeter: 4.0,
            mean_radius: 0.5,
            mean_radius2: 0.25,
            contacts: Vec::new(),
            gamma,
            hard_core_vectors: Vec::new(),
            invasion_vectors: Vec::new(),
        }
    }

    #[test]
    fn test_order_parameter_aligned_and_opposed() {
        let mut snap = PopulationSnapshot {
            step: 0,
            domain: 10.0,
            types: 1,
            particles_per_cell: 1,
            speeds: vec![0.5],
            cells: vec![
                record(0, Vec2::new(0.5, 0.0), None),
                record(0, Vec2::new(0.5, 0.0), None),
            ],
        };
        assert!((snap.order_parameter() - 1.0).abs() < 1e-12);
        snap.cells[1] = record(0, Vec2::new(-0.5, 0.0), None);
        assert!(snap.order_parameter().abs() < 1e-12);
    }

    #[test]
    fn test_mean_gamma_skips_missing() {
        let snap = PopulationSnapshot {
            step: 0,
            domain: 10.0,
            types: 2,
            particles_per_cell: 1,
            speeds: vec![1.0, 1.0],
            cells: vec![
                record(0, Vec2::ZERO, Some(0.25)),
                record(0, Vec2::ZERO, Some(0.75)),
                record(0, Vec2::ZERO, None),
                record(1, Vec2::ZERO, None),
            ],
        };
        assert_eq!(snap.mean_gamma(0), Some(0.5));
        assert_eq!(snap.mean_gamma(1), None);
    }

    #[test]
    fn test_shape_index_of_square() {
        let cell = record(0, Vec2::ZERO, None);
        assert!((cell.shape_index() - 4.0).abs() < 1e-12);
    }
}
