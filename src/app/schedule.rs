//! Steps at which a run exports.

use superboids_core::config::RunConfig;

/// Export spacing: fixed, or growing as a power of the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitSchedule {
    Interval(u64),
    /// `next = step + max(1, floor(step^factor))`
    PowerLaw(f64),
}

impl ExitSchedule {
    #[must_use]
    pub fn from_run(run: &RunConfig) -> Self {
        if run.exit_factor > 0.0 {
            Self::PowerLaw(run.exit_factor)
        } else {
            Self::Interval(run.exit_interval.max(1))
        }
    }

    /// Export step following `step`, which must itself be an export step.
    #[must_use]
    pub fn after(&self, step: u64) -> u64 {
        match *self {
            Self::Interval(interval) => step + interval,
            Self::PowerLaw(factor) => {
                let gap = (step as f64).powf(factor).floor() as u64;
                step + gap.max(1)
            }
        }
    }

    /// First export step at or after `step`.
    #[must_use]
    pub fn first_from(&self, step: u64) -> u64 {
        match *self {
            Self::Interval(interval) => step.div_ceil(interval) * interval,
            Self::PowerLaw(_) => {
                let mut at = 0;
                while at < step {
                    at = self.after(at);
                }
                at
            }
        }
    }
}
