//! Point masses that make up a cell.

use crate::geometry::Displacement;
use crate::grid::BoxId;
use superboids_data::{CellId, CellType, ParticleKey, Vec2};

/// Next cortex index around a ring of `n` particles (nucleus excluded).
#[must_use]
pub fn ring_next(i: usize, n: usize) -> usize {
    ring_offset(i, 1, n)
}

#[must_use]
pub fn ring_prev(i: usize, n: usize) -> usize {
    if i > 1 {
        i - 1
    } else {
        n - 1
    }
}

/// Cortex index `k` steps ahead of `i`; cortex indices run `1..n`.
#[must_use]
pub fn ring_offset(i: usize, k: usize, n: usize) -> usize {
    let ring = n - 1;
    (i - 1 + k) % ring + 1
}

/// Same-cell ring neighbor used by the twist and tangent forces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwistLink {
    pub neighbor: usize,
    /// Signed equilibrium angle seen from this particle.
    pub eq_angle: f64,
    /// From this particle to the neighbor, refreshed on reset.
    pub distance: Displacement,
}

/// A foreign particle within the cutoff, captured at neighbor search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub key: ParticleKey,
    pub cell_type: CellType,
    pub velocity: Vec2,
    /// From the searching particle to this one.
    pub distance: Displacement,
}

/// Candidates of one foreign cell, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    pub cell: CellId,
    pub members: Vec<Neighbor>,
}

impl NeighborList {
    fn insert_sorted(&mut self, neighbor: Neighbor) {
        let at = self
            .members
            .partition_point(|m| m.distance.module <= neighbor.distance.module);
        self.members.insert(at, neighbor);
    }
}

/// Foreign ring segment this particle was last found behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvasionMemory {
    pub cell: CellId,
    pub step: u64,
    /// Cortex indices of the offending segment in the foreign cell.
    pub segment: (usize, usize),
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub key: ParticleKey,
    pub position: Vec2,
    pub velocity: Vec2,
    pub new_velocity: Vec2,
    /// From this particle to its nucleus.
    pub radial: Displacement,
    pub twist: Vec<TwistLink>,
    pub noise_sum: Vec2,
    pub velocity_sum: Vec2,
    pub force_sum: Vec2,
    pub neighbors: Vec<NeighborList>,
    pub invasion_counter: u32,
    pub invasion_memory: Vec<InvasionMemory>,
    pub grid_box: Option<BoxId>,
}

impl Particle {
    #[must_use]
    pub fn new(key: ParticleKey, position: Vec2) -> Self {
        Self {
            key,
            position,
            velocity: Vec2::ZERO,
            new_velocity: Vec2::ZERO,
            radial: Displacement::default(),
            twist: Vec::new(),
            noise_sum: Vec2::ZERO,
            velocity_sum: Vec2::ZERO,
            force_sum: Vec2::ZERO,
            neighbors: Vec::new(),
            invasion_counter: 0,
            invasion_memory: Vec::new(),
            grid_box: None,
        }
    }

    #[must_use]
    pub fn is_nucleus(&self) -> bool {
        self.key.is_nucleus()
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.key.is_virtual
    }

    /// Overwrites the per-tick state; calling it twice equals calling it once.
    pub fn clear_accumulators(&mut self) {
        self.noise_sum = Vec2::ZERO;
        self.velocity_sum = Vec2::ZERO;
        self.force_sum = Vec2::ZERO;
        self.neighbors.clear();
    }

    pub fn set_radial(&mut self, nucleus: Vec2, domain: f64) {
        self.radial = Displacement::between(self.position, nucleus, domain);
    }

    pub fn add_neighbor(&mut self, cell: CellId, neighbor: Neighbor) {
        match self.neighbors.iter_mut().find(|l| l.cell == cell) {
            Some(list) => list.insert_sorted(neighbor),
            None => self.neighbors.push(NeighborList {
                cell,
                members: vec![neighbor],
            }),
        }
    }

    /// Drops every candidate of `cell`.
    pub fn forget_cell(&mut self, cell: CellId) {
        self.neighbors.retain(|l| l.cell != cell);
    }

    #[must_use]
    pub fn neighbor_count(&self) -> usize {
        self.neighbors.iter().map(|l| l.members.len()).sum()
    }

    /// Neighbor count per cell type.
    #[must_use]
    pub fn type_counts(&self, types: usize) -> Vec<usize> {
        let mut counts = vec![0; types];
        for neighbor in self.neighbors.iter().flat_map(|l| &l.members) {
            if let Some(slot) = counts.get_mut(neighbor.cell_type) {
                *slot += 1;
            }
        }
        counts
    }

    /// Keeps only invasion memories refreshed on the previous tick or later.
    pub fn prune_invasion_memory(&mut self, step: u64) {
        self.invasion_memory.retain(|m| m.step + 1 >= step);
    }

    pub fn remember_invasion(&mut self, cell: CellId, step: u64, segment: (usize, usize)) {
        match self.invasion_memory.iter_mut().find(|m| m.cell == cell) {
            Some(memory) => memory.step = step,
            None => self.invasion_memory.push(InvasionMemory {
                cell,
                step,
                segment,
            }),
        }
    }

    #[must_use]
    pub fn remembered_segment(&self, cell: CellId) -> Option<(usize, usize)> {
        self.invasion_memory
            .iter()
            .find(|m| m.cell == cell)
            .map(|m| m.segment)
    }
}
