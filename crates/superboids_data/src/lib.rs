//! # Superboids Data
//!
//! Plain data types shared by the engine, the exporters and the binary.
//! Nothing here knows about forces or threads.

/// Boundary, initial-placement and kill-condition selectors
pub mod conditions;
/// Two-dimensional vector type used for positions, velocities and forces
pub mod geometry;
/// Stable identities of cells and particles
pub mod identity;
/// Read-only population snapshots and initial-state payloads
pub mod snapshot;

pub use conditions::{BoundaryCondition, InitialCondition, KillCondition};
pub use geometry::Vec2;
pub use identity::{CellId, CellType, DeathState, ParticleKey};
pub use snapshot::{
    CellRecord, ForceVector, InitialCell, InitialState, ParticleRecord, PopulationSnapshot,
};
