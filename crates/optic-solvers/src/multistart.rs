//! Best-of-N restarts of a seeded backend.
//!
//! Run `k` uses seed `base_seed + k`. Runs execute in parallel and are
//! reduced by `(energy, k)`, so the winner does not depend on scheduling.

use optic_core::error::Result;
use optic_core::qubo::QuboModel;
use optic_core::solver::{QuboSolver, SolverOutcome};
use rayon::prelude::*;
use tracing::{debug, info};

/// Builds one backend instance for a given seed
pub type SeededFactory = dyn Fn(u64) -> Box<dyn QuboSolver> + Send + Sync;

/// Parallel best-of-N wrapper
pub struct MultiStart {
    name: &'static str,
    restarts: usize,
    base_seed: u64,
    factory: Box<SeededFactory>,
}

impl MultiStart {
    pub fn new(
        restarts: usize,
        base_seed: u64,
        factory: impl Fn(u64) -> Box<dyn QuboSolver> + Send + Sync + 'static,
    ) -> Self {
        let name = factory(base_seed).name();
        Self {
            name,
            restarts: restarts.max(1),
            base_seed,
            factory: Box::new(factory),
        }
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }
}

impl std::fmt::Debug for MultiStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiStart")
            .field("name", &self.name)
            .field("restarts", &self.restarts)
            .field("base_seed", &self.base_seed)
            .finish()
    }
}

impl QuboSolver for MultiStart {
    fn name(&self) -> &'static str {
        self.name
    }

    fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
        let runs: Vec<(usize, SolverOutcome)> = (0..self.restarts)
            .into_par_iter()
            .map(|k| {
                let seed = self.base_seed.wrapping_add(k as u64);
                (self.factory)(seed).minimize(model).map(|out| (k, out))
            })
            .collect::<Result<_>>()?;

        let evaluations = runs.iter().map(|(_, o)| o.evaluations).sum();
        for (k, out) in &runs {
            debug!("Restart {}: energy {:.4}", k, out.energy);
        }
        let Some((k, best)) = runs
            .into_iter()
            .min_by(|a, b| a.1.energy.total_cmp(&b.1.energy).then(a.0.cmp(&b.0)))
        else {
            return Ok(SolverOutcome::empty());
        };
        info!(
            "Best of {} {} runs: restart {} (seed {}), energy {:.4}",
            self.restarts,
            self.name,
            k,
            self.base_seed.wrapping_add(k as u64),
            best.energy
        );
        Ok(SolverOutcome {
            evaluations,
            ..best
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anneal::SimulatedAnnealing;
    use optic_core::config::AnnealingParams;

    fn short_annealer(seed: u64) -> Box<dyn QuboSolver> {
        Box::new(SimulatedAnnealing::new(
            AnnealingParams {
                iterations: 300,
                initial_temperature: 5.0,
                cooling_rate: 0.99,
            },
            seed,
        ))
    }

    fn frustrated_ring() -> QuboModel {
        let n = 9;
        let pairs = (0..n).map(|i| ((i, (i + 1) % n), 6.0));
        QuboModel::from_coefficients(vec![-4.0; n], pairs).unwrap()
    }

    #[test]
    fn test_never_worse_than_first_run() {
        let model = frustrated_ring();
        let single = short_annealer(100).minimize(&model).unwrap();
        let multi = MultiStart::new(6, 100, short_annealer).minimize(&model).unwrap();
        assert!(multi.energy <= single.energy);
        assert_eq!(multi.evaluations, 6 * 300);
    }

    #[test]
    fn test_parallel_reduction_is_deterministic() {
        let model = frustrated_ring();
        let a = MultiStart::new(8, 3, short_annealer).minimize(&model).unwrap();
        let b = MultiStart::new(8, 3, short_annealer).minimize(&model).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reports_inner_name() {
        let multi = MultiStart::new(2, 0, short_annealer);
        assert_eq!(multi.name(), "annealing");
        assert_eq!(multi.restarts(), 2);
    }
}
