//! # Superboids IO
//!
//! Output files of a run: the restartable last-state archive and the
//! per-step exporters.

/// Error type for file output
pub mod error;
/// Snapshot exporters
pub mod export;
/// Binary last-state files
pub mod last_state;
/// Timestamped output paths
pub mod naming;

pub use error::{IoError, Result};
pub use export::{
    open_exporters, ExportSelection, Exporter, ForceExporter, LastStateExporter, OrderExporter,
    ShapeExporter, ShapeStats, Summary, TrajectoryExporter,
};
pub use last_state::{load_last_state, save_last_state, state_of};
pub use naming::{run_stamp, RunFiles};
