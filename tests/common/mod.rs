pub mod macros;

use std::f64::consts::TAU;
use superboids_core::{Parameters, Simulation};
use superboids_data::{InitialCell, InitialState, ParticleRecord, Vec2};

/// Builds simulations from hand-placed cells or from the regular placement.
#[allow(dead_code)]
pub struct SimulationBuilder {
    params: Parameters,
    cells: Vec<(usize, Vec2)>,
    ring_radius: Option<f64>,
    start_step: u64,
}

#[allow(dead_code)]
impl SimulationBuilder {
    pub fn new() -> Self {
        let mut params = Parameters::default();
        params.run.threads = 2;
        params.run.seed = Some(1);
        Self {
            params,
            cells: Vec::new(),
            ring_radius: None,
            start_step: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.run.seed = Some(seed);
        self
    }

    pub fn with_params<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut Parameters),
    {
        modifier(&mut self.params);
        self
    }

    /// Copies the type-0 coefficients to `types` cell types with equal
    /// proportions.
    pub fn with_types(mut self, types: usize) -> Self {
        let m = &mut self.params.mechanics;
        let row = |v: &Vec<f64>| vec![v[0]; types];
        let square = |v: &Vec<Vec<f64>>| vec![vec![v[0][0]; types]; types];
        m.radial_eq = row(&m.radial_eq);
        m.radial_beta = square(&m.radial_beta);
        m.radial_beta_medium = row(&m.radial_beta_medium);
        m.tangent_eq_factor = row(&m.tangent_eq_factor);
        m.tangent_beta = square(&m.tangent_beta);
        m.tangent_beta_medium = row(&m.tangent_beta_medium);
        m.kapa = square(&m.kapa);
        m.kapa_medium = row(&m.kapa_medium);
        m.inter_eq = square(&m.inter_eq);
        m.inter_beta = square(&m.inter_beta);
        m.inter_alpha = square(&m.inter_alpha);
        m.auto_alpha = row(&m.auto_alpha);
        m.speed = row(&m.speed);
        m.radial_plastic_begin = None;
        m.radial_plastic_end = None;
        m.tangent_plastic_begin_factor = None;
        m.tangent_plastic_end_factor = None;
        m.inter_plastic_begin = None;
        m.inter_plastic_end = None;
        self.params.cells.types = types;
        self.params.cells.proportions = vec![1.0; types];
        self
    }

    /// Hand-placed cells as `(type, nucleus)`; the cortex is an even ring.
    pub fn with_cells(mut self, cells: Vec<(usize, Vec2)>) -> Self {
        self.cells = cells;
        self
    }

    pub fn with_ring_radius(mut self, radius: f64) -> Self {
        self.ring_radius = Some(radius);
        self
    }

    pub fn with_capacity(mut self, max_cells: usize) -> Self {
        self.params.cells.max_cells = Some(max_cells);
        self
    }

    pub fn starting_at(mut self, step: u64) -> Self {
        self.start_step = step;
        self
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The hand-placed population as a loadable state.
    pub fn initial_state(&self) -> InitialState {
        let n = self.params.cells.particles_per_cell;
        let cells = self
            .cells
            .iter()
            .map(|&(cell_type, center)| {
                let radius = self
                    .ring_radius
                    .unwrap_or(self.params.mechanics.radial_eq[cell_type]);
                InitialCell {
                    cell_type,
                    particles: ring(center, radius, n),
                }
            })
            .collect();
        InitialState {
            start_step: self.start_step,
            cells,
        }
    }

    pub fn build(self) -> Simulation {
        if self.cells.is_empty() {
            return Simulation::new(self.params).expect("Failed to create simulation in test builder");
        }
        let state = self.initial_state();
        self.build_with_state(state)
    }

    /// Starts from `state`, typically an edited [`Self::initial_state`].
    pub fn build_with_state(mut self, state: InitialState) -> Simulation {
        let count = state.cells.len();
        self.params.cells.cells = count;
        let capacity = self.params.cells.max_cells.unwrap_or(count).max(count);
        self.params.cells.max_cells = Some(capacity);
        Simulation::with_initial_state(self.params, &state)
            .expect("Failed to create simulation in test builder")
    }
}

/// Nucleus at `center` and `n - 1` cortex particles evenly on a circle.
#[allow(dead_code)]
pub fn ring(center: Vec2, radius: f64, n: usize) -> Vec<ParticleRecord> {
    let cortex = n - 1;
    std::iter::once(center)
        .chain((0..cortex).map(|k| center + Vec2::from_angle(TAU * k as f64 / cortex as f64) * radius))
        .map(|position| ParticleRecord {
            position,
            velocity: Vec2::ZERO,
        })
        .collect()
}

/// Minimum-image distance between two points of a periodic square domain.
#[allow(dead_code)]
pub fn periodic_distance(a: Vec2, b: Vec2, domain: f64) -> f64 {
    superboids_core::geometry::minimum_image(b - a, domain).norm()
}
