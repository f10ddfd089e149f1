//! Run counters and structured logging setup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Ticks between periodic summaries.
pub const SUMMARY_INTERVAL: u64 = 1000;

/// Counters updated by the engine after every tick.
pub struct Metrics {
    ticks: AtomicU64,
    live_cells: AtomicU64,
    divisions: AtomicU64,
    failed_divisions: AtomicU64,
    deaths: AtomicU64,
    virtual_particles: AtomicU64,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            live_cells: AtomicU64::new(0),
            divisions: AtomicU64::new(0),
            failed_divisions: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            virtual_particles: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a finished tick and logs a summary every
    /// [`SUMMARY_INTERVAL`] ticks.
    pub fn record_tick(&self, step: u64, duration: Duration, live_cells: usize, virtuals: usize) {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        self.live_cells.store(live_cells as u64, Ordering::Relaxed);
        self.virtual_particles.store(virtuals as u64, Ordering::Relaxed);

        if ticks % SUMMARY_INTERVAL == 0 {
            tracing::info!(
                step,
                ticks,
                live_cells,
                virtuals,
                divisions = self.divisions(),
                failed_divisions = self.failed_divisions(),
                deaths = self.deaths(),
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    pub fn record_division(&self, succeeded: bool) {
        if succeeded {
            self.divisions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_divisions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_deaths(&self, count: usize) {
        self.deaths.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn live_cells(&self) -> u64 {
        self.live_cells.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn divisions(&self) -> u64 {
        self.divisions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed_divisions(&self) -> u64 {
        self.failed_divisions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deaths(&self) -> u64 {
        self.deaths.load(Ordering::Relaxed)
    }

    /// Virtual particles alive at the end of the last tick's velocity phase.
    #[must_use]
    pub fn virtual_particles(&self) -> u64 {
        self.virtual_particles.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Installs the global fmt subscriber, filtered by `RUST_LOG` (default
/// `info`). Later calls are no-ops.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_thread_names(true)
            .finish(),
    )
    .ok();
}
