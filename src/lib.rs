//! # Superboids
//!
//! Command-line front end of the superboids cell-mechanics engine: the run
//! loop, its export schedule and the parameter file handling shared by the
//! binary and the integration tests.

pub mod app;

pub use app::{load_parameters, ExitSchedule, Overrides, RunSummary, Runner};
