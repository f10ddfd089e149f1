//! Simulation parameters.
//!
//! [`Parameters`] maps one-to-one onto the TOML parameter file. It is
//! validated and turned into an immutable [`Settings`] bundle exactly once,
//! before the run starts; every component borrows that bundle instead of
//! reading global state.
//!
//! ## Example
//!
//! ```toml
//! [domain]
//! size = 60.0
//! boundary = "rectangle"
//! rectangle = [40.0, 20.0]
//!
//! [cells]
//! cells = 20
//! max_cells = 40
//!
//! [division]
//! interval = 10
//! cooldown = 200
//! ```
//!
//! Per-type entries are vectors indexed by cell type and per-pair entries
//! are `types x types` matrices indexed `[own][other]`.

use crate::forces::SpringLaw;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use superboids_data::{BoundaryCondition, InitialCondition, KillCondition, Vec2};

/// Circular obstacle of the Stokes boundary.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct HoleConfig {
    pub center: Vec2,
    pub radius: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DomainConfig {
    /// Side of the square, periodic index space.
    pub size: f64,
    /// Wall extents; the whole domain when unset.
    pub rectangle: Option<[f64; 2]>,
    pub boundary: BoundaryCondition,
    pub holes: Vec<HoleConfig>,
    /// Interaction cutoff, also the grid box size.
    pub neighbor_distance: f64,
    pub kill: KillCondition,
    pub p0_limit: f64,
    pub initial: InitialCondition,
    pub initial_distance: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            size: 100.0,
            rectangle: None,
            boundary: BoundaryCondition::Periodic,
            holes: Vec::new(),
            neighbor_distance: 1.1,
            kill: KillCondition::None,
            p0_limit: 4.56,
            initial: InitialCondition::HexCenter,
            initial_distance: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CellsConfig {
    pub cells: usize,
    /// Pool capacity; slots above `cells` start dead. Equal to `cells`
    /// when unset.
    pub max_cells: Option<usize>,
    pub types: usize,
    pub particles_per_cell: usize,
    pub proportions: Vec<f64>,
}

impl Default for CellsConfig {
    fn default() -> Self {
        Self {
            cells: 7,
            max_cells: None,
            types: 1,
            particles_per_cell: 12,
            proportions: vec![1.0],
        }
    }
}

impl CellsConfig {
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_cells.unwrap_or(self.cells)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MechanicsConfig {
    pub core_diameter: f64,
    /// Magnitude of the hard-core and invasion forces.
    pub core_intensity: f64,
    /// Noise amplitude.
    pub eta: f64,
    pub dt: f64,
    pub real_tolerance: f64,

    pub radial_eq: Vec<f64>,
    pub radial_plastic_begin: Option<Vec<f64>>,
    pub radial_plastic_end: Option<Vec<f64>>,
    pub radial_beta: Vec<Vec<f64>>,
    pub radial_beta_medium: Vec<f64>,

    /// Tangent equilibrium in units of the ring arc length.
    pub tangent_eq_factor: Vec<f64>,
    pub tangent_plastic_begin_factor: Option<Vec<f64>>,
    pub tangent_plastic_end_factor: Option<Vec<f64>>,
    pub tangent_beta: Vec<Vec<f64>>,
    pub tangent_beta_medium: Vec<f64>,

    pub kapa: Vec<Vec<f64>>,
    pub kapa_medium: Vec<f64>,
    /// Equilibrium angle between ring neighbors; `2*pi/(N-1)` when unset.
    pub twist_eq_angle: Option<f64>,

    pub inter_eq: Vec<Vec<f64>>,
    pub inter_beta: Vec<Vec<f64>>,
    pub inter_plastic_begin: Option<Vec<Vec<f64>>>,
    pub inter_plastic_end: Option<Vec<Vec<f64>>>,
    pub inter_alpha: Vec<Vec<f64>>,

    pub auto_alpha: Vec<f64>,
    pub speed: Vec<f64>,
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            core_diameter: 0.2,
            core_intensity: 1000.0,
            eta: 1.0,
            dt: 1.0,
            real_tolerance: 1.0e-6,
            radial_eq: vec![1.0],
            radial_plastic_begin: None,
            radial_plastic_end: None,
            radial_beta: vec![vec![0.1]],
            radial_beta_medium: vec![0.1],
            tangent_eq_factor: vec![1.0],
            tangent_plastic_begin_factor: None,
            tangent_plastic_end_factor: None,
            tangent_beta: vec![vec![0.1]],
            tangent_beta_medium: vec![0.1],
            kapa: vec![vec![2.0]],
            kapa_medium: vec![2.0],
            twist_eq_angle: None,
            inter_eq: vec![vec![0.75]],
            inter_beta: vec![vec![0.1]],
            inter_plastic_begin: None,
            inter_plastic_end: None,
            inter_alpha: vec![vec![13.0]],
            auto_alpha: vec![13.0],
            speed: vec![0.007],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DivisionConfig {
    /// Ticks between division rounds; 0 disables division.
    pub interval: u64,
    /// Ticks a cell must wait after dividing.
    pub cooldown: u64,
    pub tolerable_p0: f64,
    /// Only nuclei left of this abscissa may divide.
    pub region_x: Option<f64>,
    pub max_attempts: u32,
    pub max_draws: u32,
    /// Cortex radius multiplier applied on each retry.
    pub shrink_factor: f64,
}

impl Default for DivisionConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            cooldown: 0,
            tolerable_p0: 4.0,
            region_x: None,
            max_attempts: 6,
            max_draws: 16,
            shrink_factor: 0.9,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub steps: u64,
    pub exit_interval: u64,
    /// Positive values switch exports to power-law spacing.
    pub exit_factor: f64,
    pub threads: usize,
    /// Base of the per-cell RNG seeds; wall clock when unset.
    pub seed: Option<u64>,
    /// Compute the segregation metric every tick.
    pub segregation: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: 10_000,
            exit_interval: 1000,
            exit_factor: 0.0,
            threads: 4,
            seed: None,
            segregation: false,
        }
    }
}

/// The parameter file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Parameters {
    pub domain: DomainConfig,
    pub cells: CellsConfig,
    pub mechanics: MechanicsConfig,
    pub division: DivisionConfig,
    pub run: RunConfig,
}

fn ensure_vector(name: &str, v: &[f64], types: usize) -> anyhow::Result<()> {
    anyhow::ensure!(
        v.len() == types,
        "{name} must have one entry per type ({types}), found {}",
        v.len()
    );
    anyhow::ensure!(v.iter().all(|x| x.is_finite()), "{name} must be finite");
    Ok(())
}

fn ensure_matrix(name: &str, m: &[Vec<f64>], types: usize) -> anyhow::Result<()> {
    anyhow::ensure!(
        m.len() == types && m.iter().all(|row| row.len() == types),
        "{name} must be a {types}x{types} matrix"
    );
    anyhow::ensure!(
        m.iter().flatten().all(|x| x.is_finite()),
        "{name} must be finite"
    );
    Ok(())
}

impl Parameters {
    /// Validates every parameter and every dependency between parameters.
    pub fn validate(&self) -> anyhow::Result<()> {
        let d = &self.domain;
        anyhow::ensure!(d.size > 0.0, "Domain size must be positive");
        anyhow::ensure!(
            d.neighbor_distance > 0.0 && d.neighbor_distance < d.size,
            "Neighbor distance must be in (0, domain size)"
        );
        if let Some([rx, ry]) = d.rectangle {
            anyhow::ensure!(
                rx > 0.0 && ry > 0.0 && rx <= d.size && ry <= d.size,
                "Rectangle must be positive and fit inside the domain"
            );
        }
        anyhow::ensure!(
            d.holes.iter().all(|h| h.radius > 0.0 && h.center.is_finite()),
            "Holes need a positive radius and a finite center"
        );
        anyhow::ensure!(
            d.p0_limit >= 3.545,
            "p0 limit must be at least 3.545 (a circle)"
        );
        anyhow::ensure!(d.initial_distance > 0.0, "Initial distance must be positive");

        let c = &self.cells;
        anyhow::ensure!(c.particles_per_cell >= 4, "A cell needs at least 4 particles");
        anyhow::ensure!(c.cells >= 1, "At least one cell is required");
        anyhow::ensure!(
            c.cells <= c.capacity(),
            "Initial cells ({}) exceed max_cells ({})",
            c.cells,
            c.capacity()
        );
        anyhow::ensure!(
            c.capacity() <= u32::MAX as usize,
            "max_cells does not fit a cell id"
        );
        anyhow::ensure!(c.types >= 1, "At least one cell type is required");
        ensure_vector("proportions", &c.proportions, c.types)?;
        anyhow::ensure!(
            c.proportions.iter().all(|p| *p >= 0.0) && c.proportions.iter().sum::<f64>() > 0.0,
            "Proportions must be non-negative with a positive sum"
        );

        let m = &self.mechanics;
        let t = c.types;
        anyhow::ensure!(m.core_diameter > 0.0, "Core diameter must be positive");
        anyhow::ensure!(m.core_intensity > 0.0, "Core intensity must be positive");
        anyhow::ensure!(m.eta >= 0.0, "Noise amplitude must be non-negative");
        anyhow::ensure!(m.dt > 0.0, "dt must be positive");
        anyhow::ensure!(m.real_tolerance >= 0.0, "Tolerance must be non-negative");
        ensure_vector("radial_eq", &m.radial_eq, t)?;
        anyhow::ensure!(
            m.radial_eq.iter().all(|r| *r > m.core_diameter),
            "radial_eq must exceed the core diameter"
        );
        if let Some(v) = &m.radial_plastic_begin {
            ensure_vector("radial_plastic_begin", v, t)?;
        }
        if let Some(v) = &m.radial_plastic_end {
            ensure_vector("radial_plastic_end", v, t)?;
        }
        ensure_matrix("radial_beta", &m.radial_beta, t)?;
        ensure_vector("radial_beta_medium", &m.radial_beta_medium, t)?;
        ensure_vector("tangent_eq_factor", &m.tangent_eq_factor, t)?;
        if let Some(v) = &m.tangent_plastic_begin_factor {
            ensure_vector("tangent_plastic_begin_factor", v, t)?;
        }
        if let Some(v) = &m.tangent_plastic_end_factor {
            ensure_vector("tangent_plastic_end_factor", v, t)?;
        }
        ensure_matrix("tangent_beta", &m.tangent_beta, t)?;
        ensure_vector("tangent_beta_medium", &m.tangent_beta_medium, t)?;
        ensure_matrix("kapa", &m.kapa, t)?;
        ensure_vector("kapa_medium", &m.kapa_medium, t)?;
        ensure_matrix("inter_eq", &m.inter_eq, t)?;
        anyhow::ensure!(
            m.inter_eq.iter().flatten().all(|r| *r > 0.0),
            "inter_eq must be positive"
        );
        ensure_matrix("inter_beta", &m.inter_beta, t)?;
        if let Some(v) = &m.inter_plastic_begin {
            ensure_matrix("inter_plastic_begin", v, t)?;
        }
        if let Some(v) = &m.inter_plastic_end {
            ensure_matrix("inter_plastic_end", v, t)?;
        }
        ensure_matrix("inter_alpha", &m.inter_alpha, t)?;
        ensure_vector("auto_alpha", &m.auto_alpha, t)?;
        ensure_vector("speed", &m.speed, t)?;
        anyhow::ensure!(m.speed.iter().all(|s| *s > 0.0), "Speeds must be positive");

        let div = &self.division;
        anyhow::ensure!(
            (1.0..5.0).contains(&div.tolerable_p0),
            "Tolerable p0 must be in [1, 5)"
        );
        anyhow::ensure!(
            div.max_attempts >= 1 && div.max_draws >= 1,
            "Division needs at least one attempt and one draw"
        );
        anyhow::ensure!(
            div.shrink_factor > 0.0 && div.shrink_factor <= 1.0,
            "Division shrink factor must be in (0, 1]"
        );
        if div.interval > 0 {
            let min_req = m.radial_eq.iter().copied().fold(f64::INFINITY, f64::min);
            let distance = division_distance(c.particles_per_cell, m.core_diameter);
            anyhow::ensure!(
                distance <= min_req - m.core_diameter,
                "Division distance {distance:.4} exceeds radial_eq - core_diameter ({:.4})",
                min_req - m.core_diameter
            );
        }

        let r = &self.run;
        anyhow::ensure!(r.threads >= 1, "At least one worker thread is required");
        anyhow::ensure!(r.exit_interval >= 1, "Exit interval must be positive");
        anyhow::ensure!(r.exit_factor >= 0.0, "Exit factor must be non-negative");

        Ok(())
    }

    /// Parses and validates a TOML parameter file.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let params = toml::from_str::<Self>(content)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Hash of everything that shapes the dynamics.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.domain).as_bytes());
        hasher.update(format!("{:?}", self.cells).as_bytes());
        hasher.update(format!("{:?}", self.mechanics).as_bytes());
        hasher.update(format!("{:?}", self.division).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Computes the quantities that depend on several parameters.
    #[must_use]
    pub fn derive(&self) -> Derived {
        let size = self.domain.size;
        let m = &self.mechanics;
        let n = self.cells.particles_per_cell;
        let types = self.cells.types;
        let ring = (n - 1) as f64;

        let boxes_in_edge = ((size / self.domain.neighbor_distance).floor() as usize).max(3);
        let rectangle = self.domain.rectangle.unwrap_or([size, size]);

        let per_type = |v: &Option<Vec<f64>>, fallback: f64| -> Vec<f64> {
            v.clone().unwrap_or_else(|| vec![fallback; types])
        };
        let radial_begin = per_type(&m.radial_plastic_begin, size);
        let radial_end = per_type(&m.radial_plastic_end, size);
        let tangent_begin = per_type(&m.tangent_plastic_begin_factor, size);
        let tangent_end = per_type(&m.tangent_plastic_end_factor, size);

        let arc: Vec<f64> = m.radial_eq.iter().map(|r| TAU * r / ring).collect();
        let radial_law = (0..types)
            .map(|t| SpringLaw::new(m.radial_eq[t], radial_begin[t], radial_end[t]))
            .collect();
        let tangent_law = (0..types)
            .map(|t| {
                SpringLaw::new(
                    m.tangent_eq_factor[t] * arc[t],
                    tangent_begin[t] * arc[t],
                    tangent_end[t] * arc[t],
                )
            })
            .collect();
        let inter_law = (0..types)
            .map(|a| {
                (0..types)
                    .map(|b| {
                        let begin = m
                            .inter_plastic_begin
                            .as_ref()
                            .map_or(size, |mm| mm[a][b]);
                        let end = m.inter_plastic_end.as_ref().map_or(size, |mm| mm[a][b]);
                        SpringLaw::new(m.inter_eq[a][b], begin, end)
                    })
                    .collect()
            })
            .collect();

        let target_area = m.radial_eq.iter().map(|r| PI * r * r).collect();
        let harris_amount = (0..types)
            .map(|t| {
                let mean_inter = m.inter_eq[t].iter().sum::<f64>() / types as f64;
                let ratio = (self.domain.neighbor_distance / (m.radial_eq[t] + mean_inter)).min(1.0);
                (n as f64 * 4.0 * ratio.asin() / TAU).floor() as usize
            })
            .collect();

        let total: f64 = self.cells.proportions.iter().sum();
        let proportions = self.cells.proportions.iter().map(|p| p / total).collect();

        Derived {
            boxes_in_edge,
            rectangle,
            target_area,
            harris_amount,
            division_distance: division_distance(n, m.core_diameter),
            arc,
            radial_law,
            tangent_law,
            inter_law,
            twist_eq_angle: m.twist_eq_angle.unwrap_or(TAU / ring),
            proportions,
            max_virtuals: 4 * n,
        }
    }
}

/// Nucleus offset used when splitting a cell.
#[must_use]
pub fn division_distance(particles_per_cell: usize, core_diameter: f64) -> f64 {
    (particles_per_cell - 1) as f64 * core_diameter / 6.0 + 2.0 * core_diameter
}

/// Quantities computed once from [`Parameters`].
#[derive(Debug, Clone)]
pub struct Derived {
    pub boxes_in_edge: usize,
    pub rectangle: [f64; 2],
    pub target_area: Vec<f64>,
    /// Expected neighbor count per type for the Harris parameter.
    pub harris_amount: Vec<usize>,
    pub division_distance: f64,
    pub arc: Vec<f64>,
    pub radial_law: Vec<SpringLaw>,
    pub tangent_law: Vec<SpringLaw>,
    pub inter_law: Vec<Vec<SpringLaw>>,
    pub twist_eq_angle: f64,
    pub proportions: Vec<f64>,
    pub max_virtuals: usize,
}

/// Validated parameters plus derived quantities, shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub params: Parameters,
    pub derived: Derived,
}

impl Settings {
    pub fn new(params: Parameters) -> anyhow::Result<Self> {
        params.validate()?;
        let derived = params.derive();
        Ok(Self { params, derived })
    }

    #[must_use]
    pub fn domain(&self) -> f64 {
        self.params.domain.size
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.params.cells.capacity()
    }

    #[must_use]
    pub fn particles_per_cell(&self) -> usize {
        self.params.cells.particles_per_cell
    }

    #[must_use]
    pub fn core_diameter(&self) -> f64 {
        self.params.mechanics.core_diameter
    }

    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.params.mechanics.core_intensity
    }

    #[must_use]
    pub fn speed(&self, cell_type: usize) -> f64 {
        self.params.mechanics.speed[cell_type]
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.params.mechanics.real_tolerance
    }

    /// Largest displacement of one tick for a cell type.
    #[must_use]
    pub fn max_step(&self, cell_type: usize) -> f64 {
        self.params.mechanics.dt * self.speed(cell_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_validate() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn test_too_few_particles() {
        let params = Parameters {
            cells: CellsConfig {
                particles_per_cell: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_mismatched_type_tables() {
        let params = Parameters {
            cells: CellsConfig {
                types: 2,
                proportions: vec![0.5, 0.5],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = params.validate().unwrap_err().to_string();
        assert!(err.contains("radial_eq"));
    }

    #[test]
    fn test_division_distance_dependency() {
        let params = Parameters {
            mechanics: MechanicsConfig {
                radial_eq: vec![0.9],
                ..Default::default()
            },
            division: DivisionConfig {
                interval: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_tolerable_p0_range() {
        let params = Parameters {
            division: DivisionConfig {
                tolerable_p0: 5.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_derived_defaults() {
        let derived = Parameters::default().derive();
        assert_eq!(derived.boxes_in_edge, 90);
        assert_eq!(derived.rectangle, [100.0, 100.0]);
        assert!((derived.target_area[0] - PI).abs() < 1e-12);
        assert!((derived.division_distance - (11.0 * 0.2 / 6.0 + 0.4)).abs() < 1e-12);
        assert!((derived.twist_eq_angle - TAU / 11.0).abs() < 1e-12);
        assert_eq!(derived.max_virtuals, 48);
        // 12 * 4 * asin(1.1 / 1.75) / 2pi
        assert_eq!(derived.harris_amount[0], 5);
    }

    #[test]
    fn test_small_domain_keeps_three_boxes() {
        let params = Parameters {
            domain: DomainConfig {
                size: 2.0,
                neighbor_distance: 1.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(params.derive().boxes_in_edge, 3);
    }

    #[test]
    fn test_toml_round_trip_keeps_fingerprint() {
        let params = Parameters::default();
        let text = params.to_toml().unwrap();
        let back = Parameters::from_toml(&text).unwrap();
        assert_eq!(params.fingerprint(), back.fingerprint());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let params = Parameters::from_toml("[cells]\ncells = 30\n").unwrap();
        assert_eq!(params.cells.cells, 30);
        assert_eq!(params.cells.capacity(), 30);
        assert_eq!(params.cells.particles_per_cell, 12);
        assert_eq!(params.domain.boundary, BoundaryCondition::Periodic);
    }
}
