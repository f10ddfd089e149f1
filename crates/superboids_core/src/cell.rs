//! A cell: one nucleus plus a closed ring of cortex particles.
//!
//! Cells live in a fixed pool indexed by [`CellId`]. A slot is never
//! reallocated; division and death only move it between activation states.
//! Every operation that touches the grid takes it explicitly so that grid
//! membership stays in step with the particles.

use crate::config::Settings;
use crate::geometry::{angle_between, Displacement};
use crate::grid::SpatialGrid;
use crate::particle::{ring_next, ring_prev, Particle, TwistLink};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::f64::consts::TAU;
use superboids_data::{
    CellId, CellRecord, CellType, DeathState, ForceVector, ParticleKey, ParticleRecord, Vec2,
};

/// Seed of a cell's private RNG stream.
#[must_use]
pub fn cell_seed(base: u64, id: CellId) -> u64 {
    base ^ (u64::from(id) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Polygon measures of the cortex ring, cached per step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shape {
    pub area: f64,
    pub perimeter: f64,
    /// Mean nucleus-cortex distance.
    pub mean_radius: f64,
    /// Mean squared nucleus-cortex distance.
    pub mean_radius2: f64,
    pub step: Option<u64>,
}

impl Shape {
    /// Perimeter over square root of area.
    #[must_use]
    pub fn index(&self) -> f64 {
        if self.area > 0.0 {
            self.perimeter / self.area.sqrt()
        } else {
            f64::INFINITY
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub id: CellId,
    pub cell_type: CellType,
    pub state: DeathState,
    /// Nucleus at index 0, cortex ring after it.
    pub particles: Vec<Particle>,
    /// Scratch particles of the current tick.
    pub virtuals: Vec<Particle>,
    pub shape: Shape,
    pub rng: ChaCha8Rng,
    pub last_division_step: Option<u64>,
    /// Cells touched this tick.
    pub contacts: BTreeSet<CellId>,
    pub gamma: Option<f64>,
    pub hard_core_vectors: Vec<ForceVector>,
    pub invasion_vectors: Vec<ForceVector>,
    pub death_message: Option<String>,
}

impl Cell {
    /// A dead cell with `n` particles stacked at the origin.
    #[must_use]
    pub fn new(id: CellId, n: usize, twist_eq_angle: f64, seed: u64) -> Self {
        let particles = (0..n)
            .map(|index| {
                let mut p = Particle::new(ParticleKey::real(id, index), Vec2::ZERO);
                if index > 0 {
                    p.twist = vec![
                        TwistLink {
                            neighbor: ring_prev(index, n),
                            eq_angle: -twist_eq_angle,
                            distance: Displacement::default(),
                        },
                        TwistLink {
                            neighbor: ring_next(index, n),
                            eq_angle: twist_eq_angle,
                            distance: Displacement::default(),
                        },
                    ];
                }
                p
            })
            .collect();
        Self {
            id,
            cell_type: 0,
            state: DeathState::Dead,
            particles,
            virtuals: Vec::new(),
            shape: Shape::default(),
            rng: ChaCha8Rng::seed_from_u64(cell_seed(seed, id)),
            last_division_step: None,
            contacts: BTreeSet::new(),
            gamma: None,
            hard_core_vectors: Vec::new(),
            invasion_vectors: Vec::new(),
            death_message: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != DeathState::Dead
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state == DeathState::Live
    }

    #[must_use]
    pub fn nucleus(&self) -> &Particle {
        &self.particles[0]
    }

    #[must_use]
    pub fn nucleus_position(&self) -> Vec2 {
        self.particles[0].position
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Vec2> {
        self.particles.iter().map(|p| p.position).collect()
    }

    #[must_use]
    pub fn ring_len(&self) -> usize {
        self.particles.len() - 1
    }

    /// Dead to Live with fresh per-life state. Does not touch the grid.
    pub fn activate(&mut self, cell_type: CellType) {
        self.state = DeathState::Live;
        self.cell_type = cell_type;
        self.death_message = None;
        self.last_division_step = None;
        self.gamma = None;
        self.shape = Shape::default();
        self.contacts.clear();
        self.hard_core_vectors.clear();
        self.invasion_vectors.clear();
        for p in &mut self.particles {
            p.clear_accumulators();
            p.invasion_counter = 0;
            p.invasion_memory.clear();
        }
    }

    /// Marks a live cell for removal at the start of the next tick.
    pub fn flag_for_death(&mut self, message: impl Into<String>) {
        if self.state == DeathState::Live {
            self.state = DeathState::WillDie;
            self.death_message = Some(message.into());
        }
    }

    /// Transition to Dead, evicting every particle from the grid.
    pub fn deactivate(&mut self, grid: &mut SpatialGrid) {
        self.clear_virtuals(grid);
        self.evict(grid);
        self.state = DeathState::Dead;
        self.contacts.clear();
    }

    /// Registers every real particle in the box covering it.
    pub fn register(&mut self, grid: &mut SpatialGrid) {
        for p in &mut self.particles {
            let id = grid.box_index_of(p.position);
            grid.append(id, p.key);
            p.grid_box = Some(id);
        }
    }

    pub fn evict(&mut self, grid: &mut SpatialGrid) {
        for p in &mut self.particles {
            if let Some(id) = p.grid_box.take() {
                grid.remove(id, p.key);
            }
        }
    }

    /// Moves real particles whose position left their box.
    pub fn sync_grid(&mut self, grid: &mut SpatialGrid) {
        for p in &mut self.particles {
            p.grid_box = Some(grid.relocate(p.key, p.grid_box, p.position));
        }
    }

    pub fn clear_virtuals(&mut self, grid: &mut SpatialGrid) {
        for v in self.virtuals.drain(..) {
            if let Some(id) = v.grid_box {
                grid.remove(id, v.key);
            }
        }
    }

    /// Recomputes radial and twist displacements from current positions.
    pub fn refresh_geometry(&mut self, domain: f64) {
        let positions = self.positions();
        let nucleus = positions[0];
        for p in self.particles.iter_mut().skip(1) {
            p.set_radial(nucleus, domain);
            for link in &mut p.twist {
                link.distance = Displacement::between(p.position, positions[link.neighbor], domain);
            }
        }
        for v in &mut self.virtuals {
            v.set_radial(nucleus, domain);
        }
    }

    /// Clears per-tick accumulators and neighbor data; optionally refreshes
    /// the cached shape. Idempotent.
    pub fn reset(&mut self, step: u64, domain: f64, with_shape: bool) {
        for p in self.particles.iter_mut().chain(self.virtuals.iter_mut()) {
            p.clear_accumulators();
        }
        self.refresh_geometry(domain);
        self.contacts.clear();
        self.hard_core_vectors.clear();
        self.invasion_vectors.clear();
        if with_shape {
            self.set_shape(step, domain);
        }
    }

    /// Shape measures, recomputed at most once per step.
    pub fn set_shape(&mut self, step: u64, domain: f64) -> Shape {
        if self.shape.step != Some(step) {
            self.refresh_shape(step, domain);
        }
        self.shape
    }

    pub fn refresh_shape(&mut self, step: u64, domain: f64) -> Shape {
        let n = self.particles.len();
        let nucleus = self.nucleus_position();
        let radial: Vec<Displacement> = self
            .particles
            .iter()
            .map(|p| Displacement::between(nucleus, p.position, domain))
            .collect();

        let mut shape = Shape {
            step: Some(step),
            ..Shape::default()
        };
        for i in 1..n {
            let j = ring_next(i, n);
            let edge = Displacement::between(self.particles[i].position, self.particles[j].position, domain);
            shape.perimeter += edge.module;
            let opening = angle_between(radial[i].angle(), radial[j].angle()).abs();
            shape.area += 0.5 * radial[i].module * radial[j].module * opening.sin();
            shape.mean_radius += radial[i].module;
            shape.mean_radius2 += radial[i].module * radial[i].module;
        }
        let ring = (n - 1) as f64;
        shape.mean_radius /= ring;
        shape.mean_radius2 /= ring;
        self.shape = shape;
        shape
    }

    #[must_use]
    pub fn shape_index(&self) -> f64 {
        self.shape.index()
    }

    /// Radial equilibrium distance, ramped up after a division.
    #[must_use]
    pub fn radial_req(&self, step: u64, settings: &Settings) -> f64 {
        let base = settings.params.mechanics.radial_eq[self.cell_type];
        let division = &settings.params.division;
        match self.last_division_step {
            Some(last) if division.interval > 0 && division.cooldown > 0 => {
                let elapsed = step.saturating_sub(last);
                if elapsed >= division.cooldown {
                    base
                } else {
                    let start = settings.derived.division_distance;
                    start + (base - start) * elapsed as f64 / division.cooldown as f64
                }
            }
            _ => base,
        }
    }

    /// Tangent equilibrium distance, scaled with the radial ramp.
    #[must_use]
    pub fn tangent_req(&self, step: u64, settings: &Settings) -> f64 {
        let base_radial = settings.params.mechanics.radial_eq[self.cell_type];
        let base = settings.derived.tangent_law[self.cell_type].req;
        base * self.radial_req(step, settings) / base_radial
    }

    pub fn random_angle(&mut self) -> f64 {
        self.rng.gen_range(0.0..TAU)
    }

    /// Places the cell as a regular ring around `nucleus` with one heading.
    pub fn arrange(&mut self, nucleus: Vec2, radius: f64, heading: Vec2, settings: &Settings) {
        let n = self.particles.len();
        let delta = TAU / (n - 1) as f64;
        let half = 0.5 * settings.domain();
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.position = if i == 0 {
                nucleus
            } else {
                nucleus + Vec2::from_angle(delta * (i - 1) as f64) * radius
            };
            p.position = Vec2::new(
                crate::geometry::wrap_coordinate(p.position.x, half),
                crate::geometry::wrap_coordinate(p.position.y, half),
            );
            p.velocity = heading;
            p.new_velocity = heading;
        }
    }

    /// Read-only export record.
    #[must_use]
    pub fn record(&self) -> CellRecord {
        CellRecord {
            id: self.id,
            cell_type: self.cell_type,
            particles: self
                .particles
                .iter()
                .map(|p| ParticleRecord {
                    position: p.position,
                    velocity: p.velocity,
                })
                .collect(),
            area: self.shape.area,
            perimeter: self.shape.perimeter,
            mean_radius: self.shape.mean_radius,
            mean_radius2: self.shape.mean_radius2,
            contacts: self.contacts.iter().copied().collect(),
            gamma: self.gamma,
            hard_core_vectors: self.hard_core_vectors.clone(),
            invasion_vectors: self.invasion_vectors.clone(),
        }
    }
}
