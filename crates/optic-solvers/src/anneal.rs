//! Simulated annealing over single-bit flips.
//!
//! The chain starts from the all-zero assignment. Each step flips one
//! uniformly chosen bit; a move that lowers the energy is always taken, any
//! other with probability `exp(-delta / T)`. The temperature decays as
//! `T <- T * cooling_rate` after every step. The best state seen is returned,
//! replaced only on strict improvement.

use optic_core::config::AnnealingParams;
use optic_core::error::Result;
use optic_core::qubo::QuboModel;
use optic_core::solver::{QuboSolver, SolverOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Seeded simulated-annealing backend
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    params: AnnealingParams,
    seed: u64,
}

impl SimulatedAnnealing {
    pub fn new(params: AnnealingParams, seed: u64) -> Self {
        Self { params, seed }
    }

    pub fn params(&self) -> &AnnealingParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl QuboSolver for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "annealing"
    }

    fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
        let n = model.num_vars();
        if n == 0 {
            return Ok(SolverOutcome::empty());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut state = vec![false; n];
        let mut energy = 0.0;
        let mut best = state.clone();
        let mut best_energy = energy;
        let mut temperature = self.params.initial_temperature;
        let mut accepted = 0u64;

        for _ in 0..self.params.iterations {
            let i = rng.gen_range(0..n);
            let delta = model.flip_delta(&state, i);
            if delta < 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
                state[i] = !state[i];
                energy += delta;
                accepted += 1;
                if energy < best_energy {
                    best_energy = energy;
                    best.copy_from_slice(&state);
                }
            }
            temperature *= self.params.cooling_rate;
        }

        debug!(
            "Annealing seed {}: {} of {} moves accepted, final T {:.3e}, best {:.4}",
            self.seed, accepted, self.params.iterations, temperature, best_energy
        );
        Ok(SolverOutcome::scored(model, best, self.params.iterations, true))
    }
}
