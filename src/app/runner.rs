//! The run loop: ticks the engine and feeds exporters on schedule.

use super::schedule::ExitSchedule;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use superboids_core::{Simulation, StepOptions};
use superboids_io::Exporter;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub final_step: u64,
    pub live_cells: usize,
    pub exports: usize,
    pub divisions: u64,
    pub deaths: u64,
    /// Set when the virtual-particle guard stopped the run.
    pub aborted: Option<String>,
    pub stopped_early: bool,
}

pub struct Runner {
    sim: Simulation,
    exporters: Vec<Box<dyn Exporter>>,
    schedule: ExitSchedule,
    total_steps: u64,
    stop: Arc<AtomicBool>,
    exports: usize,
}

impl Runner {
    #[must_use]
    pub fn new(sim: Simulation, exporters: Vec<Box<dyn Exporter>>) -> Self {
        let schedule = ExitSchedule::from_run(&sim.settings().params.run);
        let total_steps = sim.settings().params.run.steps;
        Self {
            sim,
            exporters,
            schedule,
            total_steps,
            stop: Arc::new(AtomicBool::new(false)),
            exports: 0,
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: ExitSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Flag checked between ticks; setting it ends the run after the
    /// current tick with a final export.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Runs until the configured step count, a stop request or a guard
    /// abort. Exporters are finished in every case.
    pub fn run(&mut self) -> Result<RunSummary> {
        let segregation = self.sim.settings().params.run.segregation;
        let mut next_export = self.schedule.first_from(self.sim.current_step());
        let mut aborted = None;
        let mut stopped_early = false;

        tracing::info!(
            start = self.sim.current_step(),
            total = self.total_steps,
            schedule = ?self.schedule,
            exporters = self.exporters.len(),
            "Run started"
        );

        while self.sim.current_step() < self.total_steps {
            let step = self.sim.current_step();
            let stopping = self.stop.load(Ordering::SeqCst);
            let due = step == next_export || step + 1 == self.total_steps || stopping;
            let options = StepOptions {
                shape: due,
                gamma: due || segregation,
            };

            match self.sim.step_with(options) {
                Ok(_) => {}
                Err(e) if e.is_runtime_abort() => {
                    tracing::error!(step, error = %e, "Run aborted");
                    aborted = Some(e.to_string());
                    break;
                }
                Err(e) => return Err(e).context(format!("tick {step}")),
            }

            if due {
                self.export()?;
                while next_export <= step {
                    next_export = self.schedule.after(next_export);
                }
            }
            if stopping {
                tracing::info!(step, "Stop requested");
                stopped_early = true;
                break;
            }
        }

        for exporter in &mut self.exporters {
            exporter
                .finish()
                .with_context(|| format!("finishing {} export", exporter.name()))?;
        }

        let metrics = self.sim.metrics();
        let summary = RunSummary {
            final_step: self.sim.current_step(),
            live_cells: self.sim.live_count(),
            exports: self.exports,
            divisions: metrics.divisions(),
            deaths: metrics.deaths(),
            aborted,
            stopped_early,
        };
        tracing::info!(
            final_step = summary.final_step,
            live_cells = summary.live_cells,
            exports = summary.exports,
            divisions = summary.divisions,
            deaths = summary.deaths,
            elapsed_ms = metrics.elapsed().as_millis() as u64,
            "Run finished"
        );
        Ok(summary)
    }

    fn export(&mut self) -> Result<()> {
        let snapshot = self.sim.snapshot();
        for exporter in &mut self.exporters {
            exporter
                .export(&snapshot)
                .with_context(|| format!("{} export at step {}", exporter.name(), snapshot.step))?;
        }
        self.exports += 1;
        Ok(())
    }
}
