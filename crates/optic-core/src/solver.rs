//! Solver contract shared by every QUBO backend.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SolverSettings;
use crate::error::{OpticError, Result};
use crate::qubo::QuboModel;

/// Best assignment a backend found, with its objective value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    /// One bit per model variable
    pub assignment: Vec<bool>,
    pub energy: f64,
    /// Objective evaluations (full or incremental) spent
    pub evaluations: u64,
    /// Whether the backend met its own stopping criterion before its budget
    /// ran out. Budget-only backends report `true`.
    pub converged: bool,
}

impl SolverOutcome {
    /// Outcome for `assignment`, with the energy recomputed from `model`
    pub fn scored(model: &QuboModel, assignment: Vec<bool>, evaluations: u64, converged: bool) -> Self {
        let energy = model.energy(&assignment);
        Self {
            assignment,
            energy,
            evaluations,
            converged,
        }
    }

    /// Outcome for a model with no variables
    pub fn empty() -> Self {
        Self {
            assignment: Vec::new(),
            energy: 0.0,
            evaluations: 0,
            converged: true,
        }
    }

    /// Number of active variables
    pub fn active_count(&self) -> usize {
        self.assignment.iter().filter(|&&b| b).count()
    }
}

/// A QUBO minimizer.
///
/// Implementations are deterministic for a fixed construction (seed included)
/// and must return an assignment of exactly `model.num_vars()` bits.
pub trait QuboSolver: Send + Sync {
    /// Short backend name used in logs and reports
    fn name(&self) -> &'static str;

    /// Minimize `model`, returning the best assignment found within budget.
    fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome>;
}

impl<S: QuboSolver + ?Sized> QuboSolver for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
        (**self).minimize(model)
    }
}

/// Post-run quality policy: by default a missed target is a warning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConvergencePolicy {
    pub target_energy: Option<f64>,
    pub fail_on_nonconvergence: bool,
}

impl ConvergencePolicy {
    pub fn from_settings(settings: &SolverSettings) -> Self {
        Self {
            target_energy: settings.target_energy,
            fail_on_nonconvergence: settings.fail_on_nonconvergence,
        }
    }

    /// Check an outcome; errors only when the caller opted in.
    pub fn check(&self, solver: &str, outcome: &SolverOutcome) -> Result<()> {
        if !outcome.converged {
            warn!(
                "Solver '{}' stopped on its budget before converging (best energy {:.4})",
                solver, outcome.energy
            );
        }
        let Some(target) = self.target_energy else {
            return Ok(());
        };
        if outcome.energy <= target {
            return Ok(());
        }
        let err = OpticError::nonconvergence(solver, outcome.energy, target);
        if self.fail_on_nonconvergence {
            return Err(err);
        }
        warn!("{}; keeping the best solution found", err);
        Ok(())
    }
}
