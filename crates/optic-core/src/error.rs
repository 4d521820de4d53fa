//! Error types for the OPTIC-5G site-selection engine

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, OpticError>;

/// Errors that can occur while loading sites or running the selection pipeline
#[derive(Error, Debug)]
pub enum OpticError {
    /// Input data is unusable (missing coordinate columns, mask/catalog length
    /// mismatch, malformed mask characters).
    #[error("validation failed: {context}")]
    Validation {
        /// What was being validated and why it failed
        context: String,
    },

    /// Demand points that no pooled candidate covers. The refiner recovers
    /// from this by excluding the points; the variant exists so the condition
    /// has a stable rendering in logs and reports.
    #[error("infeasible covering constraints: {points} demand point(s) have no covering candidate")]
    InfeasibleConstraint {
        /// Number of excluded demand points
        points: usize,
    },

    /// A vector's length does not match what its consumer requires, e.g. a
    /// solver assignment against the candidate list. Always fatal.
    #[error("shape mismatch: expected length {expected}, got {got}")]
    Shape {
        /// Required length
        expected: usize,
        /// Length actually supplied
        got: usize,
    },

    /// A solver exhausted its budget without reaching the configured target.
    #[error("solver '{solver}' did not converge: best energy {best_energy:.4} above target {target:.4}")]
    SolverNonconvergence {
        /// Backend name
        solver: String,
        /// Best objective value found
        best_energy: f64,
        /// Target the run was required to reach
        target: f64,
    },

    /// Invalid configuration value or inconsistent combination of values
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl OpticError {
    /// Create a validation error
    pub fn validation(context: impl Into<String>) -> Self {
        Self::Validation {
            context: context.into(),
        }
    }

    /// Create an infeasible-constraint error for `points` uncoverable demand points
    pub fn infeasible_constraint(points: usize) -> Self {
        Self::InfeasibleConstraint { points }
    }

    /// Create a shape error
    pub fn shape(expected: usize, got: usize) -> Self {
        Self::Shape { expected, got }
    }

    /// Create a solver non-convergence error
    pub fn nonconvergence(solver: impl Into<String>, best_energy: f64, target: f64) -> Self {
        Self::SolverNonconvergence {
            solver: solver.into(),
            best_energy,
            target,
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the pipeline must abort on this error rather than fall back
    /// to the previous stage's output.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InfeasibleConstraint { .. } | Self::SolverNonconvergence { .. }
        )
    }
}
