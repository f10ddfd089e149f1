//! # Superboids Core
//!
//! Off-lattice simulation of deformable cells in two dimensions. Every cell
//! is a nucleus particle surrounded by a ring of cortex particles; particles
//! are self-propelled, interact through piecewise spring laws and a hard
//! core, and live on a periodic spatial grid.
//!
//! The crate contains:
//! - Parameters, validation and derived quantities
//! - The spatial grid and periodic geometry helpers
//! - Force laws, the triangle-fan invasion test and boundary handling
//! - The per-tick pipeline over a barrier-synchronized worker pool
//! - Division, initial placement, metrics and structured logging
//!
//! ## Example
//!
//! ```no_run
//! use superboids_core::{Parameters, Simulation};
//!
//! let mut params = Parameters::default();
//! params.run.seed = Some(42);
//! let mut sim = Simulation::new(params)?;
//! for _ in 0..100 {
//!     sim.step()?;
//! }
//! println!("order parameter {}", sim.snapshot().order_parameter());
//! # Ok::<(), superboids_core::EngineError>(())
//! ```

/// Cell state, shape measures and grid membership
pub mod cell;
/// Boundary conditions, holes and kill checks
pub mod boundary;
/// Parameter file, validation and derived quantities
pub mod config;
/// Division rounds with bounded retries
pub mod division;
/// Per-tick pipeline
pub mod engine;
/// Engine error type
pub mod error;
/// Spring laws, hard core and the Harris parameter
pub mod forces;
/// Minimum-image displacements and angle helpers
pub mod geometry;
/// Uniform toroidal box grid
pub mod grid;
/// Hexagonal and left-edge placement, loaded states
pub mod initial;
/// Triangle-fan intrusion test
pub mod invasion;
/// Velocity and position updates
pub mod mechanics;
/// Run counters and logging setup
pub mod metrics;
/// Neighbor search, contact repair and segregation
pub mod neighbors;
/// Particles and their per-tick bookkeeping
pub mod particle;
/// Immutable population copy for parallel reads
pub mod view;
/// Gap-filling virtual particles
pub mod virtuals;
/// Partitioned worker pool
pub mod workers;

pub use cell::{Cell, Shape};
pub use config::{Parameters, Settings};
pub use division::DivisionOutcome;
pub use engine::{Simulation, StepOptions, StepReport};
pub use error::{EngineError, Result};
pub use grid::SpatialGrid;
pub use metrics::{init_logging, Metrics};
pub use superboids_data::{
    BoundaryCondition, CellId, InitialCondition, InitialState, KillCondition, PopulationSnapshot, Vec2,
};
