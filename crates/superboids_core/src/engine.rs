//! The simulation: a fixed pool of cells, the spatial grid and the worker
//! pool, advanced one tick at a time.
//!
//! A tick runs these phases in order. Parallel phases hand every partition
//! to the pool and return after all of them finished; the others run on the
//! calling thread.
//!
//! | #  | phase                                   | mode      |
//! |----|-----------------------------------------|-----------|
//! | 1  | recenter the population (periodic only) | serial    |
//! | 2  | deactivate cells flagged last tick      | serial    |
//! | 3  | segregation metric (optional)           | parallel  |
//! | 4  | reset accumulators, optional shape      | parallel  |
//! | 5  | virtual insertion, then registration    | par + ser |
//! | 6  | neighbor search, contact merge          | par + ser |
//! | 7  | neighbor repair                         | parallel  |
//! | 8  | velocity update                         | parallel  |
//! | 9  | virtual-particle guard                  | serial    |
//! | 10 | position update, boundary, kill checks  | parallel  |
//! | 11 | division round                          | serial    |
//! | 12 | grid reconciliation                     | serial    |

use crate::cell::Cell;
use crate::config::{Parameters, Settings};
use crate::division::{division_round, DivisionOutcome};
use crate::error::{EngineError, Result};
use crate::grid::SpatialGrid;
use crate::initial::{apply_initial_state, place_population};
use crate::mechanics::{update_positions, update_velocities};
use crate::metrics::Metrics;
use crate::neighbors::{merge_contacts, repair_cell, search_cell, segregation};
use crate::view::PopulationView;
use crate::virtuals::{insert_virtuals, register_virtuals};
use crate::workers::WorkerPool;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::time::Instant;
use superboids_data::{
    BoundaryCondition, CellId, InitialState, ParticleKey, PopulationSnapshot, Vec2,
};

/// Resultants shorter than this leave the population where it is.
const RECENTER_EPSILON: f64 = 1.0e-9;

/// Optional work of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOptions {
    /// Recompute shapes during reset.
    pub shape: bool,
    /// Recompute the segregation metric of every cell.
    pub gamma: bool,
}

/// What one tick did.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u64,
    pub live_cells: usize,
    /// Cells deactivated at the start of the tick.
    pub removed: Vec<CellId>,
    /// Cells flagged for removal at the start of the next tick.
    pub flagged: Vec<(CellId, String)>,
    pub virtuals: usize,
    pub dropped_contacts: usize,
    pub division: DivisionOutcome,
}

pub struct Simulation {
    settings: Settings,
    cells: Vec<Cell>,
    grid: SpatialGrid,
    pool: WorkerPool,
    rng: ChaCha8Rng,
    step: u64,
    seed: u64,
    metrics: Metrics,
}

fn wall_clock_seed() -> u64 {
    chrono::Utc::now().timestamp_micros().unsigned_abs()
}

impl Simulation {
    /// Validates `params` and places the initial population.
    pub fn new(params: Parameters) -> Result<Self> {
        let mut sim = Self::empty(params)?;
        let killed = {
            let Self {
                cells,
                grid,
                rng,
                settings,
                ..
            } = &mut sim;
            place_population(cells, grid, rng, settings)?
        };
        sim.metrics.record_deaths(killed);
        sim.log_start(killed);
        Ok(sim)
    }

    /// Validates `params` and starts from a loaded population.
    pub fn with_initial_state(params: Parameters, state: &InitialState) -> Result<Self> {
        if state.start_step > params.run.steps {
            return Err(EngineError::StartStepBeyondTotal {
                start: state.start_step,
                total: params.run.steps,
            });
        }
        let mut sim = Self::empty(params)?;
        let killed = apply_initial_state(&mut sim.cells, &mut sim.grid, state, &sim.settings)?;
        sim.step = state.start_step;
        sim.metrics.record_deaths(killed);
        sim.log_start(killed);
        Ok(sim)
    }

    fn empty(params: Parameters) -> Result<Self> {
        let settings = Settings::new(params).map_err(|e| EngineError::invalid_parameters(&e))?;
        let seed = settings.params.run.seed.unwrap_or_else(wall_clock_seed);
        let n = settings.particles_per_cell();
        let twist = settings.derived.twist_eq_angle;
        let cells = (0..settings.capacity())
            .map(|id| Cell::new(id as CellId, n, twist, seed))
            .collect();
        let grid = SpatialGrid::new(settings.domain(), settings.derived.boxes_in_edge);
        let pool = WorkerPool::new(settings.params.run.threads)?;
        Ok(Self {
            settings,
            cells,
            grid,
            pool,
            rng: ChaCha8Rng::seed_from_u64(seed),
            step: 0,
            seed,
            metrics: Metrics::new(),
        })
    }

    fn log_start(&self, killed: usize) {
        tracing::info!(
            seed = self.seed,
            start_step = self.step,
            live_cells = self.live_count(),
            killed,
            threads = self.pool.threads(),
            fingerprint = %self.settings.params.fingerprint(),
            "Simulation ready"
        );
    }

    /// Runs one tick with the options configured in the parameters.
    pub fn step(&mut self) -> Result<StepReport> {
        let options = StepOptions {
            shape: false,
            gamma: self.settings.params.run.segregation,
        };
        self.step_with(options)
    }

    pub fn step_with(&mut self, options: StepOptions) -> Result<StepReport> {
        let started = Instant::now();
        let step = self.step;

        if self.settings.params.domain.boundary == BoundaryCondition::Periodic {
            self.recenter();
        }

        let removed = self.remove_flagged();

        let Self {
            settings,
            cells,
            grid,
            pool,
            rng,
            metrics,
            ..
        } = &mut *self;
        let settings = &*settings;
        let domain = settings.domain();

        if options.gamma {
            let view = pool.install(|| PopulationView::capture(cells));
            pool.for_each_active(cells, |cell| cell.gamma = segregation(cell, &view));
        }

        pool.for_each_active(cells, |cell| cell.reset(step, domain, options.shape));

        let virtuals: usize = pool
            .map_active(cells, |cell| insert_virtuals(cell, step, settings))
            .into_iter()
            .sum();
        for cell in cells.iter_mut().filter(|c| c.is_active()) {
            register_virtuals(cell, grid);
        }

        let view = pool.install(|| PopulationView::capture(cells));
        {
            let grid = &*grid;
            let reports = pool.map_active(cells, |cell| search_cell(cell, grid, &view, settings));
            merge_contacts(cells, &reports);
        }

        let dropped_contacts: usize = pool
            .map_active(cells, |cell| repair_cell(cell, &view, settings).len())
            .into_iter()
            .sum();

        pool.for_each_active(cells, |cell| update_velocities(cell, step, &view, settings));

        let limit = settings.derived.max_virtuals;
        if let Some(runaway) = cells
            .iter()
            .find(|c| c.is_active() && c.virtuals.len() > limit)
        {
            let err = EngineError::TooManyVirtuals {
                cell: runaway.id,
                count: runaway.virtuals.len(),
                limit,
            };
            tracing::error!(step, error = %err, "Aborting run");
            for cell in cells.iter_mut() {
                cell.clear_virtuals(grid);
            }
            return Err(err);
        }

        let flagged: Vec<(CellId, String)> = pool
            .map_active(cells, |cell| {
                let verdict = update_positions(cell, step, settings)?;
                cell.flag_for_death(verdict.clone());
                Some((cell.id, verdict))
            })
            .into_iter()
            .flatten()
            .collect();
        for (cell, reason) in &flagged {
            tracing::warn!(step, cell, reason = %reason, "Cell flagged for removal");
        }

        let division = division_round(cells, grid, step, rng, settings);
        match &division {
            DivisionOutcome::Divided { .. } => metrics.record_division(true),
            DivisionOutcome::Exhausted { .. } | DivisionOutcome::PoolFull { .. } => {
                metrics.record_division(false);
            }
            DivisionOutcome::NotDue | DivisionOutcome::NoCandidate => {}
        }

        for cell in cells.iter_mut().filter(|c| c.is_active()) {
            cell.clear_virtuals(grid);
            cell.sync_grid(grid);
        }

        let live_cells = cells.iter().filter(|c| c.is_active()).count();
        metrics.record_tick(step, started.elapsed(), live_cells, virtuals);
        self.step += 1;

        Ok(StepReport {
            step,
            live_cells,
            removed,
            flagged,
            virtuals,
            dropped_contacts,
            division,
        })
    }

    /// Shifts every active particle so the periodic mean of the real
    /// particles sits at the origin.
    fn recenter(&mut self) {
        let domain = self.settings.domain();
        let half = 0.5 * domain;
        let mut sums = [Vec2::ZERO; 2];
        let mut count = 0usize;
        for p in self.cells.iter().filter(|c| c.is_active()).flat_map(|c| &c.particles) {
            for (dim, sum) in sums.iter_mut().enumerate() {
                *sum += Vec2::from_angle(TAU * (p.position.axis(dim) + half) / domain);
            }
            count += 1;
        }
        if count == 0 {
            return;
        }
        let mut shift = Vec2::ZERO;
        for (dim, sum) in sums.iter().enumerate() {
            if sum.norm() / (count as f64) < RECENTER_EPSILON {
                return;
            }
            let angle = sum.y.atan2(sum.x).rem_euclid(TAU);
            *shift.axis_mut(dim) = angle * domain / TAU - half;
        }
        let Self { cells, grid, .. } = &mut *self;
        for cell in cells.iter_mut().filter(|c| c.is_active()) {
            for p in &mut cell.particles {
                p.position = Vec2::new(
                    crate::geometry::wrap_coordinate(p.position.x - shift.x, half),
                    crate::geometry::wrap_coordinate(p.position.y - shift.y, half),
                );
            }
            cell.sync_grid(grid);
        }
    }

    fn remove_flagged(&mut self) -> Vec<CellId> {
        let mut removed = Vec::new();
        for cell in self.cells.iter_mut().filter(|c| c.state == superboids_data::DeathState::WillDie) {
            tracing::info!(
                cell = cell.id,
                reason = cell.death_message.as_deref().unwrap_or("unknown"),
                "Cell removed"
            );
            cell.deactivate(&mut self.grid);
            removed.push(cell.id);
        }
        self.metrics.record_deaths(removed.len());
        removed
    }

    /// Read-only copy of every active cell for exporters.
    #[must_use]
    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            step: self.step,
            domain: self.settings.domain(),
            types: self.settings.params.cells.types,
            particles_per_cell: self.settings.particles_per_cell(),
            speeds: self.settings.params.mechanics.speed.clone(),
            cells: self
                .cells
                .iter()
                .filter(|c| c.is_active())
                .map(Cell::record)
                .collect(),
        }
    }

    /// Keys of real particles that are not registered exactly once, in the
    /// box covering their position, plus stray registrations.
    #[must_use]
    pub fn misplaced_particles(&self) -> Vec<ParticleKey> {
        let mut registered: HashMap<ParticleKey, Vec<usize>> = HashMap::new();
        for id in 0..self.grid.len() {
            if let Some(b) = self.grid.get(id) {
                for &key in &b.occupants {
                    registered.entry(key).or_default().push(id);
                }
            }
        }
        let mut misplaced = Vec::new();
        for cell in self.cells.iter().filter(|c| c.is_active()) {
            for p in &cell.particles {
                match registered.remove(&p.key) {
                    Some(boxes) if boxes == [self.grid.box_index_of(p.position)] => {}
                    _ => misplaced.push(p.key),
                }
            }
        }
        misplaced.extend(registered.into_keys());
        misplaced
    }

    /// Rebuilds every registration from current positions.
    pub fn rebuild_grid(&mut self) {
        self.grid.clear();
        for cell in &mut self.cells {
            cell.virtuals.clear();
            for p in &mut cell.particles {
                p.grid_box = None;
            }
            if cell.is_active() {
                cell.register(&mut self.grid);
            }
        }
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Direct access for scenario setup; call
    /// [`rebuild_grid`](Self::rebuild_grid) after moving particles.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id as usize)
    }

    #[must_use]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The step the next call to [`step`](Self::step) runs.
    #[must_use]
    pub fn current_step(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.threads()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_active()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> Parameters {
        let mut params = Parameters::default();
        params.run.seed = Some(seed);
        params.run.threads = 2;
        params
    }

    #[test]
    fn test_new_places_population() {
        let sim = Simulation::new(params(1)).unwrap();
        assert_eq!(sim.live_count(), 7);
        assert_eq!(sim.current_step(), 0);
        assert!(sim.misplaced_particles().is_empty());
        assert_eq!(sim.snapshot().cells.len(), 7);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let mut p = params(1);
        p.cells.particles_per_cell = 2;
        assert!(matches!(
            Simulation::new(p),
            Err(EngineError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_start_step_beyond_total() {
        let mut p = params(1);
        p.run.steps = 10;
        let state = InitialState {
            start_step: 11,
            cells: Vec::new(),
        };
        assert!(matches!(
            Simulation::with_initial_state(p, &state),
            Err(EngineError::StartStepBeyondTotal { start: 11, total: 10 })
        ));
    }

    #[test]
    fn test_steps_keep_grid_consistent() {
        let mut sim = Simulation::new(params(5)).unwrap();
        for expected in 0..20 {
            let report = sim.step().unwrap();
            assert_eq!(report.step, expected);
            assert!(sim.misplaced_particles().is_empty());
        }
        assert_eq!(sim.current_step(), 20);
        assert_eq!(sim.metrics().ticks(), 20);
        assert!(sim.cells().iter().all(|c| c.virtuals.is_empty()));
    }

    #[test]
    fn test_runaway_virtuals_abort_the_tick() {
        let mut sim = Simulation::new(params(4)).unwrap();
        let id = sim.cells().iter().find(|c| c.is_active()).unwrap().id;
        // Two ring edges each span about 56 units, far beyond the gap limit.
        sim.cells_mut()[id as usize].particles[3].position += Vec2::new(40.0, 40.0);
        sim.rebuild_grid();

        let err = sim.step().unwrap_err();
        match &err {
            EngineError::TooManyVirtuals { cell, count, limit } => {
                assert_eq!(*cell, id);
                assert_eq!(*limit, 4 * sim.settings().particles_per_cell());
                assert!(count > limit);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_runtime_abort());
        assert_eq!(sim.current_step(), 0);

        let grid = sim.grid();
        let virtual_keys = (0..grid.len())
            .flat_map(|b| grid.occupants(b).iter())
            .filter(|key| key.is_virtual)
            .count();
        assert_eq!(virtual_keys, 0);
        assert_eq!(
            grid.occupant_count(),
            sim.live_count() * sim.settings().particles_per_cell()
        );
        assert!(sim.cells().iter().all(|c| c.virtuals.is_empty()));
    }

    #[test]
    fn test_recenter_moves_mean_to_origin() {
        let mut sim = Simulation::new(params(9)).unwrap();
        for cell in sim.cells_mut() {
            for p in &mut cell.particles {
                p.position += Vec2::new(3.0, -2.0);
            }
        }
        sim.rebuild_grid();
        sim.recenter();
        let active: Vec<Vec2> = sim
            .cells()
            .iter()
            .filter(|c| c.is_active())
            .flat_map(|c| c.particles.iter().map(|p| p.position))
            .collect();
        let mean = active.iter().fold(Vec2::ZERO, |acc, p| acc + *p) * (1.0 / active.len() as f64);
        assert!(mean.norm() < 0.05);
        assert!(sim.misplaced_particles().is_empty());
    }
}
