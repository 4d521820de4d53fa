//! # optic-solvers -- QUBO Backends
//!
//! Interchangeable minimizers for the [`QuboModel`](optic_core::qubo::QuboModel)
//! produced by `optic-core`:
//!
//! - **Simulated annealing**: single-flip Metropolis chain with geometric
//!   cooling. The default backend.
//! - **Variational sampler**: eigensolver-style product-state ansatz trained
//!   with parameter-shift gradients, scoring sample batches by CVaR and
//!   keeping the best bitstring drawn.
//! - **Exhaustive**: Gray-code enumeration, exact for small pools.
//!
//! Every backend is seeded at construction. [`build_solver`] turns the
//! `solver` configuration section into a ready backend, wrapping seeded
//! backends in a parallel best-of-N [`MultiStart`] when `restarts > 1`.
//!
//! # Quick Start
//!
//! ```rust
//! use optic_core::config::SolverSettings;
//! use optic_core::qubo::QuboModel;
//! use optic_solvers::build_solver;
//!
//! let model = QuboModel::from_coefficients(vec![-1.0, -1.0], [((0, 1), 5.0)]).unwrap();
//! let solver = build_solver(&SolverSettings::default(), 42).unwrap();
//! let out = solver.minimize(&model).unwrap();
//! assert_eq!(out.energy, -1.0);
//! ```

pub mod anneal;
pub mod exhaustive;
pub mod multistart;
pub mod sampler;

pub use anneal::SimulatedAnnealing;
pub use exhaustive::ExhaustiveSolver;
pub use multistart::MultiStart;
pub use sampler::{SamplerRun, VariationalSampler};

use optic_core::config::{SolverBackend, SolverSettings};
use optic_core::error::{OpticError, Result};
use optic_core::solver::QuboSolver;

/// Build the configured backend, seeded with `seed`.
pub fn build_solver(settings: &SolverSettings, seed: u64) -> Result<Box<dyn QuboSolver>> {
    if settings.restarts == 0 {
        return Err(OpticError::invalid_parameter("restarts", "must be at least 1"));
    }
    let solver: Box<dyn QuboSolver> = match &settings.backend {
        SolverBackend::Exhaustive(params) => Box::new(ExhaustiveSolver::new(params.clone())),
        SolverBackend::Annealing(params) if settings.restarts > 1 => {
            let params = params.clone();
            Box::new(MultiStart::new(settings.restarts, seed, move |s| {
                Box::new(SimulatedAnnealing::new(params.clone(), s))
            }))
        }
        SolverBackend::Annealing(params) => Box::new(SimulatedAnnealing::new(params.clone(), seed)),
        SolverBackend::Sampler(params) if settings.restarts > 1 => {
            let params = params.clone();
            Box::new(MultiStart::new(settings.restarts, seed, move |s| {
                Box::new(VariationalSampler::new(params.clone(), s))
            }))
        }
        SolverBackend::Sampler(params) => Box::new(VariationalSampler::new(params.clone(), seed)),
    };
    Ok(solver)
}
