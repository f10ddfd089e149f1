//! Immutable copy of particle state read by the parallel phases.
//!
//! A phase that mutates its own cell while reading every other cell works
//! on a [`PopulationView`] captured at the preceding barrier. Positions and
//! velocities do not change between neighbor search and the velocity
//! update, so the copy is exact for those phases.

use crate::cell::Cell;
use rayon::prelude::*;
use superboids_data::{CellId, CellType, ParticleKey, Vec2};

#[derive(Debug, Clone, Default)]
pub struct CellView {
    pub id: CellId,
    pub cell_type: CellType,
    pub active: bool,
    /// Nucleus first, then the cortex ring.
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    pub virtual_positions: Vec<Vec2>,
}

impl CellView {
    #[must_use]
    pub fn of(cell: &Cell) -> Self {
        if !cell.is_active() {
            return Self {
                id: cell.id,
                cell_type: cell.cell_type,
                ..Self::default()
            };
        }
        Self {
            id: cell.id,
            cell_type: cell.cell_type,
            active: true,
            positions: cell.particles.iter().map(|p| p.position).collect(),
            velocities: cell.particles.iter().map(|p| p.velocity).collect(),
            virtual_positions: cell.virtuals.iter().map(|p| p.position).collect(),
        }
    }
}

/// One [`CellView`] per pool slot, indexed by cell id.
#[derive(Debug, Clone, Default)]
pub struct PopulationView {
    pub cells: Vec<CellView>,
}

impl PopulationView {
    /// Captures every slot in parallel on the current rayon pool.
    #[must_use]
    pub fn capture(cells: &[Cell]) -> Self {
        Self {
            cells: cells.par_iter().map(CellView::of).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: CellId) -> Option<&CellView> {
        self.cells.get(id as usize).filter(|c| c.active)
    }

    #[must_use]
    pub fn position(&self, key: ParticleKey) -> Option<Vec2> {
        let cell = self.get(key.cell)?;
        if key.is_virtual {
            cell.virtual_positions.get(key.index).copied()
        } else {
            cell.positions.get(key.index).copied()
        }
    }

    /// Virtual particles never move on their own.
    #[must_use]
    pub fn velocity(&self, key: ParticleKey) -> Vec2 {
        if key.is_virtual {
            return Vec2::ZERO;
        }
        self.get(key.cell)
            .and_then(|c| c.velocities.get(key.index).copied())
            .unwrap_or(Vec2::ZERO)
    }

    #[must_use]
    pub fn cell_type(&self, id: CellId) -> Option<CellType> {
        self.get(id).map(|c| c.cell_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;

    #[test]
    fn test_dead_cells_are_hidden() {
        let mut live = Cell::new(0, 4, 1.0, 0);
        live.activate(1);
        live.particles[2].position = Vec2::new(1.0, 2.0);
        live.particles[2].velocity = Vec2::new(0.1, 0.0);
        live.virtuals
            .push(Particle::new(ParticleKey::virtual_at(0, 0), Vec2::new(5.0, 5.0)));
        let dead = Cell::new(1, 4, 1.0, 0);
        let view = PopulationView::capture(&[live, dead]);

        assert_eq!(view.position(ParticleKey::real(0, 2)), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(view.velocity(ParticleKey::real(0, 2)), Vec2::new(0.1, 0.0));
        assert_eq!(view.position(ParticleKey::virtual_at(0, 0)), Some(Vec2::new(5.0, 5.0)));
        assert_eq!(view.velocity(ParticleKey::virtual_at(0, 0)), Vec2::ZERO);
        assert_eq!(view.cell_type(0), Some(1));
        assert!(view.get(1).is_none());
        assert!(view.position(ParticleKey::real(1, 0)).is_none());
    }
}
