//! Exact minimization by Gray-code enumeration.
//!
//! Successive Gray codes differ in one bit, so each of the `2^n` assignments
//! costs a single `flip_delta`. Only usable for small pools.

use optic_core::config::ExhaustiveParams;
use optic_core::error::{OpticError, Result};
use optic_core::qubo::QuboModel;
use optic_core::solver::{QuboSolver, SolverOutcome};
use tracing::debug;

/// Hard ceiling regardless of configuration
const MAX_ENUMERABLE_BITS: usize = 40;

/// Improvements smaller than this are treated as accumulated rounding.
const ENERGY_TOLERANCE: f64 = 1e-9;

/// Exhaustive enumeration backend
#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    max_bits: usize,
}

impl ExhaustiveSolver {
    pub fn new(params: ExhaustiveParams) -> Self {
        Self {
            max_bits: params.max_bits,
        }
    }
}

impl QuboSolver for ExhaustiveSolver {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
        let n = model.num_vars();
        let limit = self.max_bits.min(MAX_ENUMERABLE_BITS);
        if n > limit {
            return Err(OpticError::invalid_parameter(
                "max_bits",
                format!(
                    "{} candidates exceed the exhaustive limit of {}; use another backend",
                    n, limit
                ),
            ));
        }
        if n == 0 {
            return Ok(SolverOutcome::empty());
        }

        let mut state = vec![false; n];
        let mut energy = 0.0;
        let mut best = state.clone();
        let mut best_energy = energy;
        let total: u64 = 1 << n;

        for k in 1..total {
            let i = k.trailing_zeros() as usize;
            energy += model.flip_delta(&state, i);
            state[i] = !state[i];
            if energy < best_energy - ENERGY_TOLERANCE {
                best_energy = energy;
                best.copy_from_slice(&state);
            }
        }

        debug!("Exhaustive search over {} assignments: best {:.4}", total, best_energy);
        Ok(SolverOutcome::scored(model, best, total, true))
    }
}
