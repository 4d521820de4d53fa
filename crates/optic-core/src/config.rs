//! Configuration for the site-selection pipeline.
//!
//! Every tunable of every stage lives here and is handed explicitly to the
//! stage entry points; no stage reads ambient state.

use serde::{Deserialize, Serialize};

use crate::error::{OpticError, Result};

/// Unit in which `coverage_radius` and `interference_threshold` are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnits {
    /// Planar metric coordinates
    Meters,
    /// Great-circle distances over geographic coordinates
    Kilometers,
}

/// Inclusive axis-aligned region in the catalog's native coordinate frame.
///
/// For geographic catalogs `x` is longitude and `y` is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl RegionBounds {
    /// Whether `(x, y)` lies inside the region (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Catalog loading options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Project geographic coordinates onto a local metric plane on load
    pub project_geographic: bool,
    /// Rows outside this region are excluded before optimization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<RegionBounds>,
}

/// Demand grid and greedy stage options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSettings {
    pub units: DistanceUnits,
    /// A site covers a demand point at distance `<= coverage_radius`
    pub coverage_radius: f64,
    /// Demand grid is `grid_resolution x grid_resolution`
    pub grid_resolution: usize,
    /// Greedy stops once this fraction of demand is covered
    pub min_coverage_pct: f64,
    /// Maximum size of the candidate pool
    pub candidate_limit: usize,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            units: DistanceUnits::Meters,
            coverage_radius: 1000.0,
            grid_resolution: 20,
            min_coverage_pct: 0.95,
            candidate_limit: 64,
        }
    }
}

/// Exact refinement options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineSettings {
    pub enabled: bool,
    /// Branch-and-bound node budget; the incumbent is returned when exhausted
    pub max_nodes: u64,
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_nodes: 200_000,
        }
    }
}

/// Objective coefficients of the interference-aware quadratic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuboSettings {
    /// Sites closer than this interfere (same units as `coverage_radius`)
    pub interference_threshold: f64,
    /// Quadratic penalty for each simultaneously active interfering pair
    pub penalty_weight: f64,
    /// Constant subtracted from every linear term
    pub coverage_reward: f64,
    /// Activation cost per watt of transmit power
    pub power_cost_weight: f64,
}

impl Default for QuboSettings {
    fn default() -> Self {
        Self {
            interference_threshold: 500.0,
            penalty_weight: 500.0,
            coverage_reward: 100.0,
            power_cost_weight: 1.0,
        }
    }
}

/// Simulated annealing hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingParams {
    pub iterations: u64,
    pub initial_temperature: f64,
    /// Geometric decay factor applied to the temperature every step
    pub cooling_rate: f64,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            iterations: 20_000,
            initial_temperature: 100.0,
            cooling_rate: 0.999,
        }
    }
}

/// Variational sampler hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Bitstrings drawn per iteration
    pub shots: usize,
    pub max_iterations: u32,
    pub learning_rate: f64,
    /// Tail fraction of each sample batch whose CVaR drives the angle updates
    pub cvar_alpha: f64,
    pub convergence_threshold: f64,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            shots: 256,
            max_iterations: 100,
            learning_rate: 0.01,
            cvar_alpha: 0.3,
            convergence_threshold: 1e-6,
        }
    }
}

/// Exhaustive enumeration limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveParams {
    /// Largest candidate count the enumerator accepts
    pub max_bits: usize,
}

impl Default for ExhaustiveParams {
    fn default() -> Self {
        Self { max_bits: 20 }
    }
}

/// Which backend minimizes the QUBO, with its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverBackend {
    Annealing(AnnealingParams),
    Sampler(SamplerParams),
    Exhaustive(ExhaustiveParams),
}

impl Default for SolverBackend {
    fn default() -> Self {
        Self::Annealing(AnnealingParams::default())
    }
}

/// Solver selection and run policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Independent runs (seeds `seed`, `seed + 1`, ...); the best is kept
    pub restarts: usize,
    /// Energy a run is expected to reach
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_energy: Option<f64>,
    /// Turn a missed `target_energy` into an error instead of a warning
    pub fail_on_nonconvergence: bool,
    pub backend: SolverBackend,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            restarts: 1,
            target_energy: None,
            fail_on_nonconvergence: false,
            backend: SolverBackend::default(),
        }
    }
}

/// Complete configuration for one optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Seed for every random source in the run
    pub seed: u64,
    pub catalog: CatalogSettings,
    pub coverage: CoverageSettings,
    pub refine: RefineSettings,
    pub qubo: QuboSettings,
    pub solver: SolverSettings,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            catalog: CatalogSettings::default(),
            coverage: CoverageSettings::default(),
            refine: RefineSettings::default(),
            qubo: QuboSettings::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl OptimizerConfig {
    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set distance units together with the coverage radius
    pub fn with_coverage_radius(mut self, radius: f64, units: DistanceUnits) -> Self {
        self.coverage.coverage_radius = radius;
        self.coverage.units = units;
        self
    }

    /// Set the demand grid resolution
    pub fn with_grid_resolution(mut self, resolution: usize) -> Self {
        self.coverage.grid_resolution = resolution;
        self
    }

    /// Set the greedy coverage target
    pub fn with_min_coverage(mut self, pct: f64) -> Self {
        self.coverage.min_coverage_pct = pct;
        self
    }

    /// Set the candidate pool limit
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.coverage.candidate_limit = limit;
        self
    }

    /// Set the interference threshold
    pub fn with_interference_threshold(mut self, threshold: f64) -> Self {
        self.qubo.interference_threshold = threshold;
        self
    }

    /// Set the quadratic interference penalty
    pub fn with_penalty_weight(mut self, weight: f64) -> Self {
        self.qubo.penalty_weight = weight;
        self
    }

    /// Set the linear coverage reward
    pub fn with_coverage_reward(mut self, reward: f64) -> Self {
        self.qubo.coverage_reward = reward;
        self
    }

    /// Set the activation cost per watt
    pub fn with_power_cost_weight(mut self, weight: f64) -> Self {
        self.qubo.power_cost_weight = weight;
        self
    }

    /// Select the solver backend
    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.solver.backend = backend;
        self
    }

    /// Set the number of independent solver runs
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.solver.restarts = restarts;
        self
    }

    /// Restrict the catalog to a region
    pub fn with_bounds(mut self, bounds: RegionBounds) -> Self {
        self.catalog.bounds = Some(bounds);
        self
    }

    /// Check ranges of every value. Frame/unit consistency is checked later,
    /// once the catalog frame is known.
    pub fn validate(&self) -> Result<()> {
        let cov = &self.coverage;
        if !(cov.coverage_radius.is_finite() && cov.coverage_radius > 0.0) {
            return Err(OpticError::invalid_parameter(
                "coverage_radius",
                format!("must be positive and finite, got {}", cov.coverage_radius),
            ));
        }
        if cov.grid_resolution == 0 {
            return Err(OpticError::invalid_parameter(
                "grid_resolution",
                "must be at least 1",
            ));
        }
        if !(cov.min_coverage_pct > 0.0 && cov.min_coverage_pct <= 1.0) {
            return Err(OpticError::invalid_parameter(
                "min_coverage_pct",
                format!("must be in (0, 1], got {}", cov.min_coverage_pct),
            ));
        }
        if cov.candidate_limit == 0 {
            return Err(OpticError::invalid_parameter(
                "candidate_limit",
                "must be at least 1",
            ));
        }

        if self.refine.max_nodes == 0 {
            return Err(OpticError::invalid_parameter("max_nodes", "must be at least 1"));
        }

        let q = &self.qubo;
        non_negative("interference_threshold", q.interference_threshold)?;
        non_negative("penalty_weight", q.penalty_weight)?;
        non_negative("power_cost_weight", q.power_cost_weight)?;
        if !q.coverage_reward.is_finite() {
            return Err(OpticError::invalid_parameter(
                "coverage_reward",
                "must be finite",
            ));
        }

        if let Some(b) = &self.catalog.bounds {
            if !(b.min_x <= b.max_x && b.min_y <= b.max_y) {
                return Err(OpticError::invalid_parameter(
                    "bounds",
                    "min must not exceed max on either axis",
                ));
            }
        }

        if self.solver.restarts == 0 {
            return Err(OpticError::invalid_parameter("restarts", "must be at least 1"));
        }
        match &self.solver.backend {
            SolverBackend::Annealing(p) => {
                if p.iterations == 0 {
                    return Err(OpticError::invalid_parameter(
                        "iterations",
                        "must be at least 1",
                    ));
                }
                if !(p.initial_temperature.is_finite() && p.initial_temperature > 0.0) {
                    return Err(OpticError::invalid_parameter(
                        "initial_temperature",
                        "must be positive and finite",
                    ));
                }
                if !(p.cooling_rate > 0.0 && p.cooling_rate <= 1.0) {
                    return Err(OpticError::invalid_parameter(
                        "cooling_rate",
                        format!("must be in (0, 1], got {}", p.cooling_rate),
                    ));
                }
            }
            SolverBackend::Sampler(p) => {
                if p.shots == 0 {
                    return Err(OpticError::invalid_parameter("shots", "must be at least 1"));
                }
                if !(p.cvar_alpha > 0.0 && p.cvar_alpha <= 1.0) {
                    return Err(OpticError::invalid_parameter(
                        "cvar_alpha",
                        format!("must be in (0, 1], got {}", p.cvar_alpha),
                    ));
                }
                if !(p.learning_rate.is_finite() && p.learning_rate > 0.0) {
                    return Err(OpticError::invalid_parameter(
                        "learning_rate",
                        "must be positive and finite",
                    ));
                }
            }
            SolverBackend::Exhaustive(p) => {
                if p.max_bits > 30 {
                    return Err(OpticError::invalid_parameter(
                        "max_bits",
                        format!("enumeration above 30 bits is not supported, got {}", p.max_bits),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(OpticError::invalid_parameter(
            name,
            format!("must be non-negative and finite, got {}", value),
        ))
    }
}
