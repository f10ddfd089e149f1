//! Error type of the output crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("could not encode snapshot: {0}")]
    Encoding(String),

    /// rkyv encoding or validation of a last-state file failed
    #[error("last-state archive: {0}")]
    Archive(String),

    #[error("output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON line: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no such file: {0}")]
    Missing(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    #[must_use]
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    #[must_use]
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    #[must_use]
    pub fn missing(path: impl Into<String>) -> Self {
        Self::Missing(path.into())
    }

    /// Prefixes the error with the operation that failed.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
