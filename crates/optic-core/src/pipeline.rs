//! End-to-end site selection: coverage, greedy, refinement, QUBO, solve, mask.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::SiteCatalog;
use crate::config::OptimizerConfig;
use crate::coverage::{CoverageModel, DemandGrid};
use crate::error::{OpticError, Result};
use crate::greedy::{GreedySelector, GreedyStop};
use crate::mask::Mask;
use crate::qubo::QuboBuilder;
use crate::refine::{ExactRefiner, RefineStatus};
use crate::site::CoordinateFrame;
use crate::solver::{ConvergencePolicy, QuboSolver, SolverOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub frame: CoordinateFrame,
    pub raw_rows: usize,
    pub sites: usize,
    pub dropped_missing: usize,
    pub dropped_out_of_bounds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedySummary {
    /// Selected ids in selection order
    pub selected: Vec<usize>,
    pub coverage_fraction: f64,
    pub coverage_history: Vec<f64>,
    pub stop: GreedyStop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineSummary {
    pub pool: Vec<usize>,
    pub status: RefineStatus,
    pub constraints: usize,
    pub excluded_points: Vec<u32>,
    pub nodes_explored: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuboSummary {
    pub variables: usize,
    pub interference_terms: usize,
    /// Interfering pairs as raw-table ids
    pub interfering_pairs: Vec<(usize, usize)>,
    pub linear: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSummary {
    pub backend: String,
    pub energy: f64,
    pub evaluations: u64,
    pub converged: bool,
    /// Ids the solver activated
    pub active: Vec<usize>,
}

/// Everything one run produced, in stage order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub seed: u64,
    pub catalog: CatalogSummary,
    pub demand_points: usize,
    pub greedy: GreedySummary,
    pub refine: RefineSummary,
    pub qubo: QuboSummary,
    pub solver: SolverSummary,
    pub mask: Mask,
}

/// The staged optimizer, bound to one validated configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: OptimizerConfig,
}

impl Pipeline {
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run over the regular demand grid spanning the catalog
    pub fn run(&self, catalog: &SiteCatalog, solver: &dyn QuboSolver) -> Result<PipelineReport> {
        let grid = DemandGrid::over_catalog(catalog, self.config.coverage.grid_resolution);
        self.run_with_demand(catalog, &grid, solver)
    }

    /// Run over externally supplied demand points
    pub fn run_with_demand(
        &self,
        catalog: &SiteCatalog,
        grid: &DemandGrid,
        solver: &dyn QuboSolver,
    ) -> Result<PipelineReport> {
        let cfg = &self.config;
        info!(
            "Optimizing {} sites ({} raw rows) over {} demand points",
            catalog.len(),
            catalog.raw_len(),
            grid.len()
        );

        let model = CoverageModel::new(catalog.frame(), &cfg.coverage)?;
        let matrix = model.coverage_matrix(catalog.sites(), grid);

        let greedy = GreedySelector::new(&cfg.coverage).select(catalog, &matrix)?;
        let refined = ExactRefiner::new(&cfg.refine).refine(&greedy, &matrix);

        let qubo = QuboBuilder::new(&cfg.qubo).build(catalog, &refined.pool, &model)?;
        let outcome = if qubo.is_empty() {
            SolverOutcome::empty()
        } else {
            solver.minimize(&qubo)?
        };
        if outcome.assignment.len() != qubo.num_vars() {
            return Err(OpticError::shape(qubo.num_vars(), outcome.assignment.len()));
        }
        ConvergencePolicy::from_settings(&cfg.solver).check(solver.name(), &outcome)?;

        let mask = Mask::encode(catalog.raw_len(), qubo.candidate_ids(), &outcome.assignment)?;
        info!(
            "Solver '{}' activated {} of {} candidates (energy {:.4})",
            solver.name(),
            outcome.active_count(),
            qubo.num_vars(),
            outcome.energy
        );

        let ids = qubo.candidate_ids();
        Ok(PipelineReport {
            seed: cfg.seed,
            catalog: CatalogSummary {
                frame: catalog.frame(),
                raw_rows: catalog.raw_len(),
                sites: catalog.len(),
                dropped_missing: catalog.dropped_missing(),
                dropped_out_of_bounds: catalog.dropped_out_of_bounds(),
            },
            demand_points: grid.len(),
            greedy: GreedySummary {
                selected: greedy.pool.ids(),
                coverage_fraction: greedy.coverage_fraction,
                coverage_history: greedy.coverage_history.clone(),
                stop: greedy.stop,
            },
            refine: RefineSummary {
                pool: refined.pool.ids(),
                status: refined.status.clone(),
                constraints: refined.constraints,
                excluded_points: refined.excluded_points.clone(),
                nodes_explored: refined.nodes_explored,
            },
            qubo: QuboSummary {
                variables: qubo.num_vars(),
                interference_terms: qubo.num_quadratic_terms(),
                interfering_pairs: qubo.quadratic().keys().map(|&(i, j)| (ids[i], ids[j])).collect(),
                linear: qubo.linear().to_vec(),
            },
            solver: SolverSummary {
                backend: solver.name().to_string(),
                energy: outcome.energy,
                evaluations: outcome.evaluations,
                converged: outcome.converged,
                active: outcome
                    .assignment
                    .iter()
                    .zip(ids)
                    .filter(|(&on, _)| on)
                    .map(|(_, &id)| id)
                    .collect(),
            },
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceUnits;
    use crate::qubo::QuboModel;

    /// Activates every variable with negative linear term.
    struct LinearOnly;

    impl QuboSolver for LinearOnly {
        fn name(&self) -> &'static str {
            "linear-only"
        }

        fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
            Ok(SolverOutcome::scored(
                model,
                model.negative_linear_assignment(),
                1,
                true,
            ))
        }
    }

    struct Truncating;

    impl QuboSolver for Truncating {
        fn name(&self) -> &'static str {
            "truncating"
        }

        fn minimize(&self, _model: &QuboModel) -> Result<SolverOutcome> {
            Ok(SolverOutcome {
                assignment: vec![],
                energy: 0.0,
                evaluations: 0,
                converged: true,
            })
        }
    }

    fn four_sites() -> SiteCatalog {
        SiteCatalog::planar(&[(0.0, 0.0), (100.0, 0.0), (5000.0, 0.0), (5100.0, 0.0)]).unwrap()
    }

    fn single_point_config() -> OptimizerConfig {
        OptimizerConfig::default()
            .with_coverage_radius(10_000.0, DistanceUnits::Meters)
            .with_grid_resolution(1)
            .with_interference_threshold(200.0)
    }

    #[test]
    fn test_single_demand_point_scenario() {
        let pipeline = Pipeline::new(single_point_config()).unwrap();
        let report = pipeline.run(&four_sites(), &LinearOnly).unwrap();
        assert_eq!(report.demand_points, 1);
        assert_eq!(report.greedy.selected, vec![0]);
        assert_eq!(report.refine.pool, vec![0]);
        assert_eq!(report.qubo.variables, 1);
        assert_eq!(report.qubo.interference_terms, 0);
        assert_eq!(report.mask.to_string(), "1000");
    }

    #[test]
    fn test_mask_spans_raw_rows() {
        let sites = vec![
            crate::site::Site::new(1, 0.0, 0.0),
            crate::site::Site::new(4, 50.0, 0.0),
        ];
        let catalog = SiteCatalog::from_sites(CoordinateFrame::Planar, sites, 6).unwrap();
        let report = Pipeline::new(single_point_config())
            .unwrap()
            .run(&catalog, &LinearOnly)
            .unwrap();
        assert_eq!(report.mask.len(), 6);
        assert_eq!(report.mask.to_string(), "010000");
        assert_eq!(report.catalog.dropped_missing, 4);
    }

    #[test]
    fn test_short_solver_output_is_fatal() {
        let err = Pipeline::new(single_point_config())
            .unwrap()
            .run(&four_sites(), &Truncating)
            .unwrap_err();
        assert!(matches!(err, OpticError::Shape { expected: 1, got: 0 }));
    }

    #[test]
    fn test_empty_catalog_gives_empty_mask() {
        let catalog = SiteCatalog::planar(&[]).unwrap();
        let report = Pipeline::new(OptimizerConfig::default())
            .unwrap()
            .run(&catalog, &LinearOnly)
            .unwrap();
        assert!(report.mask.is_empty());
        assert_eq!(report.greedy.coverage_fraction, 1.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Pipeline::new(OptimizerConfig::default().with_candidate_limit(0)).is_err());
    }

    #[test]
    fn test_unit_mismatch_surfaces() {
        let config = OptimizerConfig::default().with_coverage_radius(2.0, DistanceUnits::Kilometers);
        let err = Pipeline::new(config)
            .unwrap()
            .run(&four_sites(), &LinearOnly)
            .unwrap_err();
        assert!(matches!(err, OpticError::InvalidParameter { .. }));
    }

    #[test]
    fn test_external_demand_points() {
        use crate::coverage::DemandPoint;
        let grid = DemandGrid::from_points(vec![
            DemandPoint { x: 5050.0, y: 0.0 },
            DemandPoint { x: 5100.0, y: 0.0 },
        ]);
        let config = single_point_config().with_coverage_radius(60.0, DistanceUnits::Meters);
        let report = Pipeline::new(config)
            .unwrap()
            .run_with_demand(&four_sites(), &grid, &LinearOnly)
            .unwrap();
        assert_eq!(report.refine.pool, vec![3]);
        assert_eq!(report.mask.to_string(), "0001");
    }
}
