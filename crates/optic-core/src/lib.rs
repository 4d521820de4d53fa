//! # optic-core -- Radio Site Selection Engine
//!
//! Decides which candidate radio sites should be active, trading demand
//! coverage against mutual interference. The work is staged:
//!
//! 1. **SiteCatalog** loads and validates the candidate table.
//! 2. **CoverageModel** builds a demand grid and the site/demand coverage
//!    relation.
//! 3. **GreedySelector** picks a candidate pool by maximum-coverage greedy
//!    set cover.
//! 4. **ExactRefiner** shrinks the pool to a minimum-cardinality cover of the
//!    same demand.
//! 5. **QuboBuilder** turns the pool into a sparse QUBO with interference
//!    penalties.
//! 6. A [`QuboSolver`](solver::QuboSolver) backend minimizes it.
//! 7. [`Mask`](mask::Mask) maps the result back onto every raw catalog row.
//!
//! ## Quick Start
//!
//! ```
//! use optic_core::prelude::*;
//!
//! struct NegativeLinear;
//!
//! impl QuboSolver for NegativeLinear {
//!     fn name(&self) -> &'static str {
//!         "negative-linear"
//!     }
//!     fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
//!         let x = model.negative_linear_assignment();
//!         Ok(SolverOutcome::scored(model, x, 1, true))
//!     }
//! }
//!
//! let catalog = SiteCatalog::planar(&[(0.0, 0.0), (100.0, 0.0), (5000.0, 0.0)]).unwrap();
//! let config = OptimizerConfig::default()
//!     .with_coverage_radius(10_000.0, DistanceUnits::Meters)
//!     .with_grid_resolution(1);
//! let report = Pipeline::new(config).unwrap().run(&catalog, &NegativeLinear).unwrap();
//! assert_eq!(report.mask.to_string(), "100");
//! ```

// -- Inputs --
pub mod catalog;
pub mod config;
pub mod error;
pub mod geo;
pub mod site;

// -- Selection stages --
pub mod coverage;
pub mod greedy;
pub mod refine;

// -- Quadratic model and solving --
pub mod mask;
pub mod qubo;
pub mod solver;

pub mod pipeline;

/// Re-exports of the most commonly used items.
pub mod prelude {
    pub use crate::catalog::SiteCatalog;
    pub use crate::config::{
        AnnealingParams, DistanceUnits, ExhaustiveParams, OptimizerConfig, RegionBounds,
        SamplerParams, SolverBackend, SolverSettings,
    };
    pub use crate::coverage::{CoverageMatrix, CoverageModel, DemandGrid, DemandPoint};
    pub use crate::error::{OpticError, Result};
    pub use crate::greedy::{CandidatePool, GreedySelection, GreedySelector};
    pub use crate::mask::Mask;
    pub use crate::pipeline::{Pipeline, PipelineReport};
    pub use crate::qubo::{QuboBuilder, QuboModel};
    pub use crate::refine::{ExactRefiner, RefineStatus, Refinement};
    pub use crate::site::{CoordinateFrame, Site};
    pub use crate::solver::{ConvergencePolicy, QuboSolver, SolverOutcome};
}
