//! Uniform box partition of the periodic domain.
//!
//! Boxes are addressed by a flat index `x + y * edge`. Each box stores the
//! keys of the particles currently inside it and a fixed table of its nine
//! neighbors (itself plus the eight compass directions) computed once with
//! toroidal wraparound. The table ignores the boundary condition: walls and
//! holes are enforced on particle positions, not on grid topology.
//!
//! Membership is kept in step with particle positions incrementally. The
//! engine calls [`SpatialGrid::relocate`] whenever a particle may have
//! crossed a box edge, and never rebuilds the whole grid.

use superboids_data::{ParticleKey, Vec2};

/// Flat box index.
pub type BoxId = usize;

/// Slot of a neighbor in a box's neighbor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Here,
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// Table order of [`GridBox::neighbors`].
    pub const ALL: [Direction; 9] = [
        Direction::Here,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    #[must_use]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Here => Direction::Here,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
        }
    }

    #[must_use]
    pub fn slot(self) -> usize {
        match self {
            Direction::Here => 0,
            Direction::North => 1,
            Direction::South => 2,
            Direction::East => 3,
            Direction::West => 4,
            Direction::NorthEast => 5,
            Direction::NorthWest => 6,
            Direction::SouthEast => 7,
            Direction::SouthWest => 8,
        }
    }

    /// Column and row offsets; north is increasing `y`.
    #[must_use]
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Here => (0, 0),
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, 1),
            Direction::NorthWest => (-1, 1),
            Direction::SouthEast => (1, -1),
            Direction::SouthWest => (-1, -1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridBox {
    pub id: BoxId,
    /// Box sits on the first or last row or column.
    pub in_edge: bool,
    /// Indexed by [`Direction::slot`].
    pub neighbors: [BoxId; 9],
    pub occupants: Vec<ParticleKey>,
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    domain: f64,
    boxes_in_edge: usize,
    boxes: Vec<GridBox>,
}

impl SpatialGrid {
    /// Builds an empty grid of `boxes_in_edge`^2 boxes over a square domain.
    #[must_use]
    pub fn new(domain: f64, boxes_in_edge: usize) -> Self {
        let edge = boxes_in_edge.max(3);
        let boxes = (0..edge * edge)
            .map(|id| GridBox {
                id,
                in_edge: is_edge_box(id, edge),
                neighbors: neighbor_table(id, edge),
                occupants: Vec::new(),
            })
            .collect();
        Self {
            domain,
            boxes_in_edge: edge,
            boxes,
        }
    }

    #[must_use]
    pub fn boxes_in_edge(&self) -> usize {
        self.boxes_in_edge
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box covering `position`.
    ///
    /// The position is shifted by half the domain, scaled to box units and
    /// truncated per axis. A coordinate landing exactly on the upper edge
    /// stays in the last box; anything further out wraps around.
    #[must_use]
    pub fn box_index_of(&self, position: Vec2) -> BoxId {
        let edge = self.boxes_in_edge as i64;
        let scale = self.boxes_in_edge as f64 / self.domain;
        let half = 0.5 * self.domain;
        let mut index = [0i64; 2];
        for (dim, slot) in index.iter_mut().enumerate() {
            let scaled = (position.axis(dim) + half) * scale;
            let cell = if scaled.is_finite() {
                scaled.floor() as i64
            } else {
                0
            };
            *slot = if cell == edge {
                edge - 1
            } else {
                cell.rem_euclid(edge)
            };
        }
        (index[0] + index[1] * edge) as BoxId
    }

    pub fn append(&mut self, id: BoxId, key: ParticleKey) {
        self.boxes[id].occupants.push(key);
    }

    /// Removes `key` from box `id`; false if it was not there.
    pub fn remove(&mut self, id: BoxId, key: ParticleKey) -> bool {
        let occupants = &mut self.boxes[id].occupants;
        if let Some(at) = occupants.iter().position(|k| *k == key) {
            occupants.swap_remove(at);
            true
        } else {
            false
        }
    }

    /// Moves `key` to the box covering `position`, returning the new box.
    pub fn relocate(&mut self, key: ParticleKey, current: Option<BoxId>, position: Vec2) -> BoxId {
        let target = self.box_index_of(position);
        match current {
            Some(old) if old == target => {}
            Some(old) => {
                self.remove(old, key);
                self.append(target, key);
            }
            None => self.append(target, key),
        }
        target
    }

    #[must_use]
    pub fn neighbors_of(&self, id: BoxId) -> &[BoxId; 9] {
        &self.boxes[id].neighbors
    }

    #[must_use]
    pub fn neighbor(&self, id: BoxId, direction: Direction) -> BoxId {
        self.boxes[id].neighbors[direction.slot()]
    }

    #[must_use]
    pub fn occupants(&self, id: BoxId) -> &[ParticleKey] {
        &self.boxes[id].occupants
    }

    #[must_use]
    pub fn is_edge(&self, id: BoxId) -> bool {
        self.boxes[id].in_edge
    }

    #[must_use]
    pub fn get(&self, id: BoxId) -> Option<&GridBox> {
        self.boxes.get(id)
    }

    /// Total number of registrations over all boxes.
    #[must_use]
    pub fn occupant_count(&self) -> usize {
        self.boxes.iter().map(|b| b.occupants.len()).sum()
    }

    /// Boxes that currently hold `key`. Linear scan; meant for checks.
    #[must_use]
    pub fn locate(&self, key: ParticleKey) -> Vec<BoxId> {
        self.boxes
            .iter()
            .filter(|b| b.occupants.contains(&key))
            .map(|b| b.id)
            .collect()
    }

    pub fn clear(&mut self) {
        for b in &mut self.boxes {
            b.occupants.clear();
        }
    }
}

/// Pure edge classification from index and grid width.
#[must_use]
pub fn is_edge_box(id: BoxId, edge: usize) -> bool {
    let x = id % edge;
    let y = id / edge;
    x == 0 || y == 0 || x == edge - 1 || y == edge - 1
}

fn neighbor_table(id: BoxId, edge: usize) -> [BoxId; 9] {
    let e = edge as i64;
    let x = (id % edge) as i64;
    let y = (id / edge) as i64;
    let mut table = [id; 9];
    for direction in Direction::ALL {
        let (dx, dy) = direction.offset();
        let nx = (x + dx).rem_euclid(e);
        let ny = (y + dy).rem_euclid(e);
        table[direction.slot()] = (nx + ny * e) as BoxId;
    }
    table
}
