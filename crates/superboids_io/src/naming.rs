//! Output file naming.
//!
//! Every file of a run shares a compact timestamp prefix taken when the run
//! starts, so runs launched into the same directory never collide.

use crate::error::{IoError, Result};
use std::path::{Path, PathBuf};

/// Compact local timestamp, e.g. `20260319_141502`.
#[must_use]
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Output directory plus the run's file prefix.
#[derive(Debug, Clone)]
pub struct RunFiles {
    dir: PathBuf,
    stamp: String,
}

impl RunFiles {
    /// Creates `dir` if needed and stamps the run with the current time.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_stamp(dir, run_stamp())
    }

    pub fn with_stamp<P: AsRef<Path>>(dir: P, stamp: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| IoError::from(e).with_context(format!("creating {}", dir.display())))?;
        Ok(Self {
            dir,
            stamp: stamp.into(),
        })
    }

    #[must_use]
    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<stamp>_<suffix>`.
    #[must_use]
    pub fn path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{suffix}", self.stamp))
    }
}
