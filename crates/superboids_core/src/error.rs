//! Engine error types.

use superboids_data::CellId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Geometry ran away; the run must stop.
    #[error("cell {cell} holds {count} virtual particles (limit {limit})")]
    TooManyVirtuals {
        cell: CellId,
        count: usize,
        limit: usize,
    },

    #[error("start step {start} is beyond the total of {total} steps")]
    StartStepBeyondTotal { start: u64, total: u64 },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid initial state: {0}")]
    InitialState(String),

    #[error("initial placement failed: {0}")]
    Placement(String),

    #[error("worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    #[must_use]
    pub fn invalid_parameters(err: &anyhow::Error) -> Self {
        Self::InvalidParameters(format!("{err:#}"))
    }

    #[must_use]
    pub fn initial_state<S: Into<String>>(msg: S) -> Self {
        Self::InitialState(msg.into())
    }

    #[must_use]
    pub fn placement<S: Into<String>>(msg: S) -> Self {
        Self::Placement(msg.into())
    }

    /// Raised mid-run by the virtual-particle guard, as opposed to setup.
    #[must_use]
    pub fn is_runtime_abort(&self) -> bool {
        matches!(self, Self::TooManyVirtuals { .. })
    }
}
