//! Run orchestration for the command-line binary.

pub mod params;
pub mod runner;
pub mod schedule;

pub use params::{load_parameters, Overrides};
pub use runner::{RunSummary, Runner};
pub use schedule::ExitSchedule;
