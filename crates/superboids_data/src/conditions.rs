use serde::{Deserialize, Serialize};

/// How particles are kept inside the simulation area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Toroidal wrap over the whole domain.
    #[default]
    Periodic,
    /// Reflecting walls at half the rectangle size.
    Rectangle,
    /// Reflecting walls plus circular obstacles (holes).
    Stokes,
}

impl BoundaryCondition {
    #[must_use]
    pub fn is_walled(self) -> bool {
        !matches!(self, BoundaryCondition::Periodic)
    }
}

/// Placement of the initial population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitialCondition {
    /// Hexagonal spiral around the origin.
    #[default]
    HexCenter,
    /// Columns packed against the left wall.
    LeftEdge,
}

/// Which conditions flag a cell for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KillCondition {
    #[default]
    None,
    /// Crossing the right wall.
    RightEdge,
    /// Shape index above the configured limit.
    P0,
    RightEdgeOrP0,
}

impl KillCondition {
    #[must_use]
    pub fn checks_right_edge(self) -> bool {
        matches!(self, KillCondition::RightEdge | KillCondition::RightEdgeOrP0)
    }

    #[must_use]
    pub fn checks_shape(self) -> bool {
        matches!(self, KillCondition::P0 | KillCondition::RightEdgeOrP0)
    }
}
