//! End-to-end pipeline tests with real backends
//!
//! Tests cover:
//! - The four-site reference scenario
//! - Idempotence of seeded runs
//! - Parity between annealing, sampler and exhaustive backends
//! - Degenerate objective weights
//! - Property-based checks of backend output shape

use optic_core::catalog::SiteCatalog;
use optic_core::config::{
    AnnealingParams, DistanceUnits, ExhaustiveParams, OptimizerConfig, SamplerParams,
    SolverBackend,
};
use optic_core::error::OpticError;
use optic_core::pipeline::{Pipeline, PipelineReport};
use optic_core::qubo::QuboModel;
use optic_core::solver::QuboSolver;
use optic_solvers::{build_solver, ExhaustiveSolver, SimulatedAnnealing, VariationalSampler};

fn four_sites() -> SiteCatalog {
    SiteCatalog::planar(&[(0.0, 0.0), (100.0, 0.0), (5000.0, 0.0), (5100.0, 0.0)]).unwrap()
}

fn run(catalog: &SiteCatalog, config: OptimizerConfig) -> PipelineReport {
    let solver = build_solver(&config.solver, config.seed).unwrap();
    Pipeline::new(config).unwrap().run(catalog, &solver).unwrap()
}

/// Sites spread over a few kilometres with mixed transmit powers.
fn town() -> SiteCatalog {
    let sites = (0..30)
        .map(|i| {
            let x = ((i * 37) % 11) as f64 * 300.0;
            let y = ((i * 53) % 7) as f64 * 400.0;
            optic_core::site::Site::new(i, x, y).with_tx_power(40.0 + (i % 5) as f64)
        })
        .collect();
    SiteCatalog::from_sites(optic_core::site::CoordinateFrame::Planar, sites, 30).unwrap()
}

fn town_config() -> OptimizerConfig {
    OptimizerConfig::default()
        .with_coverage_radius(700.0, DistanceUnits::Meters)
        .with_grid_resolution(12)
        .with_min_coverage(1.0)
        .with_interference_threshold(800.0)
        .with_penalty_weight(80.0)
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_four_site_reference_scenario() {
        let config = OptimizerConfig::default()
            .with_coverage_radius(10_000.0, DistanceUnits::Meters)
            .with_grid_resolution(1)
            .with_interference_threshold(200.0);
        let report = run(&four_sites(), config);

        assert_eq!(report.greedy.selected.len(), 1);
        assert_eq!(report.refine.pool, vec![0]);
        assert_eq!(report.qubo.variables, 1);
        assert_eq!(report.qubo.interference_terms, 0);
        assert_eq!(report.solver.active, vec![0]);
        assert_eq!(report.mask.to_string(), "1000");
    }

    #[test]
    fn test_reference_scenario_with_every_backend() {
        for backend in [
            SolverBackend::Annealing(AnnealingParams::default()),
            SolverBackend::Sampler(SamplerParams::default()),
            SolverBackend::Exhaustive(ExhaustiveParams::default()),
        ] {
            let config = OptimizerConfig::default()
                .with_coverage_radius(10_000.0, DistanceUnits::Meters)
                .with_grid_resolution(1)
                .with_interference_threshold(200.0)
                .with_backend(backend);
            assert_eq!(run(&four_sites(), config).mask.to_string(), "1000");
        }
    }

    #[test]
    fn test_idempotent_runs() {
        let a = run(&town(), town_config().with_seed(7));
        let b = run(&town(), town_config().with_seed(7));
        assert_eq!(a, b);
        assert_eq!(a.mask.to_string(), b.mask.to_string());
    }

    #[test]
    fn test_idempotent_with_restarts() {
        let config = town_config().with_seed(11).with_restarts(4);
        let a = run(&town(), config.clone());
        let b = run(&town(), config);
        assert_eq!(a.mask, b.mask);
        assert_eq!(a.solver.energy, b.solver.energy);
    }

    #[test]
    fn test_mask_only_marks_refined_candidates() {
        let report = run(&town(), town_config());
        for id in report.mask.active_ids() {
            assert!(report.refine.pool.contains(&id));
        }
        assert_eq!(report.mask.len(), 30);
    }

    #[test]
    fn test_refine_disabled_passes_greedy_pool() {
        let mut config = town_config();
        config.refine.enabled = false;
        let report = run(&town(), config);
        assert_eq!(report.refine.pool, report.greedy.selected);
    }
}

#[cfg(test)]
mod parity_tests {
    use super::*;

    fn pool_model() -> QuboModel {
        // Six candidates on a line, 150 m apart, interfering below 200 m.
        let linear = vec![-60.0, -55.0, -70.0, -40.0, -65.0, -50.0];
        let pairs = (0..5).map(|i| ((i, i + 1), 500.0));
        QuboModel::from_coefficients(linear, pairs).unwrap()
    }

    #[test]
    fn test_backends_agree_on_small_pool() {
        let model = pool_model();
        let exact = ExhaustiveSolver::new(ExhaustiveParams::default())
            .minimize(&model)
            .unwrap();
        let annealed = SimulatedAnnealing::new(AnnealingParams::default(), 42)
            .minimize(&model)
            .unwrap();
        let sampled = VariationalSampler::new(SamplerParams::default(), 42)
            .minimize(&model)
            .unwrap();

        // Alternating sites 0, 2, 4 is optimal.
        assert_eq!(exact.assignment, vec![true, false, true, false, true, false]);
        assert_eq!(annealed.energy, exact.energy);
        assert_eq!(sampled.energy, exact.energy);
    }

    #[test]
    fn test_pipeline_energy_matches_exhaustive() {
        let annealing = run(&town(), town_config());
        let exhaustive = run(
            &town(),
            town_config().with_backend(SolverBackend::Exhaustive(ExhaustiveParams::default())),
        );
        assert!(annealing.qubo.variables <= 20);
        assert!((annealing.solver.energy - exhaustive.solver.energy).abs() < 1e-9);
    }
}

#[cfg(test)]
mod degenerate_tests {
    use super::*;

    #[test]
    fn test_zero_penalty_activates_every_negative_candidate() {
        let config = town_config().with_penalty_weight(0.0);
        let report = run(&town(), config);
        let expected: Vec<usize> = report
            .refine
            .pool
            .iter()
            .zip(&report.qubo.linear)
            .filter(|(_, &h)| h < 0.0)
            .map(|(&id, _)| id)
            .collect();
        let mut active = report.solver.active.clone();
        active.sort_unstable();
        let mut expected_sorted = expected;
        expected_sorted.sort_unstable();
        assert_eq!(active, expected_sorted);
    }

    #[test]
    fn test_zero_reward_activates_nothing() {
        let report = run(&town(), town_config().with_coverage_reward(0.0));
        assert!(report.qubo.linear.iter().all(|&h| h > 0.0));
        assert_eq!(report.mask.active_count(), 0);
        assert_eq!(report.mask.to_string(), "0".repeat(30));
    }

    #[test]
    fn test_unreachable_target_fails_when_opted_in() {
        let mut config = town_config();
        config.solver.target_energy = Some(-1.0e9);
        config.solver.fail_on_nonconvergence = true;
        let solver = build_solver(&config.solver, config.seed).unwrap();
        let err = Pipeline::new(config).unwrap().run(&town(), &solver).unwrap_err();
        assert!(matches!(err, OpticError::SolverNonconvergence { .. }));
    }

    #[test]
    fn test_unreachable_target_warns_by_default() {
        let mut config = town_config();
        config.solver.target_energy = Some(-1.0e9);
        assert_eq!(run(&town(), config).mask.len(), 30);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn model_strategy() -> impl Strategy<Value = QuboModel> {
        (1usize..8).prop_flat_map(|n| {
            (
                proptest::collection::vec(-10.0f64..10.0, n),
                proptest::collection::vec(((0..n), (0..n), 0.0f64..20.0), 0..12),
            )
                .prop_map(|(linear, raw)| {
                    let pairs = raw
                        .into_iter()
                        .filter(|(i, j, _)| i != j)
                        .map(|(i, j, w)| ((i, j), w));
                    QuboModel::from_coefficients(linear, pairs).unwrap()
                })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_backends_return_full_assignments(model in model_strategy(), seed in 0u64..1000) {
            let annealer = SimulatedAnnealing::new(AnnealingParams { iterations: 500, ..AnnealingParams::default() }, seed);
            let sampler = VariationalSampler::new(SamplerParams { shots: 16, max_iterations: 10, ..SamplerParams::default() }, seed);
            for out in [annealer.minimize(&model).unwrap(), sampler.minimize(&model).unwrap()] {
                prop_assert_eq!(out.assignment.len(), model.num_vars());
                prop_assert!((out.energy - model.energy(&out.assignment)).abs() < 1e-9);
                prop_assert!(out.energy <= 0.0);
            }
        }

        #[test]
        fn prop_exhaustive_is_a_lower_bound(model in model_strategy(), seed in 0u64..1000) {
            let exact = ExhaustiveSolver::new(ExhaustiveParams::default()).minimize(&model).unwrap();
            let annealed = SimulatedAnnealing::new(AnnealingParams { iterations: 500, ..AnnealingParams::default() }, seed)
                .minimize(&model)
                .unwrap();
            prop_assert!(exact.energy <= annealed.energy + 1e-9);
        }
    }
}
