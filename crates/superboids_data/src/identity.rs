use serde::{Deserialize, Serialize};

/// Stable cell identifier, equal to the cell's slot in the population pool.
pub type CellId = u32;

/// Index into the per-type coefficient tables.
pub type CellType = usize;

/// Activation state of a cell slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeathState {
    Live,
    /// Flagged by a kill check, deactivated at the start of the next tick.
    WillDie,
    #[default]
    Dead,
}

/// Identity of a particle: owning cell, local index and virtual flag.
///
/// Local index 0 of a real particle is always the nucleus. Virtual
/// particles are numbered separately from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleKey {
    pub cell: CellId,
    pub index: usize,
    pub is_virtual: bool,
}

impl ParticleKey {
    #[must_use]
    pub const fn real(cell: CellId, index: usize) -> Self {
        Self {
            cell,
            index,
            is_virtual: false,
        }
    }

    #[must_use]
    pub const fn virtual_at(cell: CellId, index: usize) -> Self {
        Self {
            cell,
            index,
            is_virtual: true,
        }
    }

    #[must_use]
    pub const fn is_nucleus(&self) -> bool {
        !self.is_virtual && self.index == 0
    }
}
