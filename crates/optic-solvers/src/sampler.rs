//! Variational sampler with CVaR scoring.
//!
//! An eigensolver-style backend. Each variable is a qubit prepared by a
//! single Ry(theta_i) rotation from |0>, so the trial distribution is a
//! product of Bernoulli variables with `p_i = sin^2(theta_i / 2)`. The
//! classical loop:
//!
//! 1. Evaluates the expected QUBO energy of the product state.
//! 2. Draws `shots` bitstrings, scores each, and records the CVaR (mean of
//!    the lowest `alpha` fraction) of the batch. The best bitstring ever
//!    sampled is kept.
//! 3. Updates every angle by descending the shift difference of the batch
//!    CVaR
//!
//! ```text
//! g_i = [ CVaR(theta_i + pi/2) - CVaR(theta_i - pi/2) ] / 2
//! ```
//!
//! where both shifted batches reuse the uniforms drawn for the current
//! batch. With `alpha = 1` this is the parameter-shift gradient of the
//! sampled mean energy; smaller `alpha` only rewards the low-energy tail.
//!
//! The loop stops once the expected energy changes by less than the
//! convergence threshold between iterations.

use std::f64::consts::{FRAC_PI_2, PI};

use optic_core::config::SamplerParams;
use optic_core::error::Result;
use optic_core::qubo::QuboModel;
use optic_core::solver::{QuboSolver, SolverOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

/// Full record of one sampler run.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerRun {
    /// Best sampled bitstring and its energy
    pub outcome: SolverOutcome,
    /// Expected energy of the product state at each iteration
    pub energy_history: Vec<f64>,
    /// CVaR of each sample batch
    pub cvar_history: Vec<f64>,
    /// Activation probabilities after the last update
    pub probabilities: Vec<f64>,
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Energy evaluation
// ---------------------------------------------------------------------------

/// Activation probabilities of the product state
pub fn probabilities(theta: &[f64]) -> Vec<f64> {
    theta.iter().map(|t| (t / 2.0).sin().powi(2)).collect()
}

/// Expected QUBO energy under independent activation probabilities `p`.
pub fn expected_energy(model: &QuboModel, p: &[f64]) -> f64 {
    let linear: f64 = model.linear().iter().zip(p).map(|(h, pi)| h * pi).sum();
    let quadratic: f64 = model
        .quadratic()
        .iter()
        .map(|(&(i, j), w)| w * p[i] * p[j])
        .sum();
    linear + quadratic
}

/// Conditional value at risk: mean of the lowest `ceil(alpha * n)` values.
///
/// Sorts `energies` in place. Returns `None` for an empty slice.
pub fn cvar(energies: &mut [f64], alpha: f64) -> Option<f64> {
    if energies.is_empty() {
        return None;
    }
    energies.sort_by(|a, b| a.total_cmp(b));
    let k = ((alpha * energies.len() as f64).ceil() as usize).clamp(1, energies.len());
    Some(energies[..k].iter().sum::<f64>() / k as f64)
}

/// One sampled bitstring with the uniforms that produced it
#[derive(Debug, Clone)]
struct Shot {
    uniforms: Vec<f64>,
    bits: Vec<bool>,
    energy: f64,
}

impl Shot {
    fn draw<R: Rng>(model: &QuboModel, p: &[f64], rng: &mut R) -> Self {
        let uniforms: Vec<f64> = p.iter().map(|_| rng.gen::<f64>()).collect();
        let bits: Vec<bool> = uniforms.iter().zip(p).map(|(u, pi)| u < pi).collect();
        let energy = model.energy(&bits);
        Self {
            uniforms,
            bits,
            energy,
        }
    }
}

/// Shift difference of the batch CVaR for every angle.
///
/// A shifted shot differs from its base shot in at most the shifted bit, so
/// its energy is one `flip_delta` away.
fn cvar_gradient(model: &QuboModel, theta: &[f64], shots: &[Shot], alpha: f64) -> Vec<f64> {
    let mut plus = Vec::with_capacity(shots.len());
    let mut minus = Vec::with_capacity(shots.len());
    (0..theta.len())
        .map(|i| {
            let p_plus = ((theta[i] + FRAC_PI_2) / 2.0).sin().powi(2);
            let p_minus = ((theta[i] - FRAC_PI_2) / 2.0).sin().powi(2);
            plus.clear();
            minus.clear();
            for shot in shots {
                let delta = model.flip_delta(&shot.bits, i);
                let shifted = |p: f64| {
                    if (shot.uniforms[i] < p) == shot.bits[i] {
                        shot.energy
                    } else {
                        shot.energy + delta
                    }
                };
                plus.push(shifted(p_plus));
                minus.push(shifted(p_minus));
            }
            match (cvar(&mut plus, alpha), cvar(&mut minus, alpha)) {
                (Some(up), Some(down)) => (up - down) / 2.0,
                _ => 0.0,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// Seeded variational sampling backend
#[derive(Debug, Clone)]
pub struct VariationalSampler {
    params: SamplerParams,
    seed: u64,
}

impl VariationalSampler {
    pub fn new(params: SamplerParams, seed: u64) -> Self {
        Self { params, seed }
    }

    /// Run the optimization loop and keep the full trace.
    pub fn run(&self, model: &QuboModel) -> SamplerRun {
        let n = model.num_vars();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut theta = vec![FRAC_PI_2; n];

        let mut best = vec![false; n];
        let mut best_energy = 0.0;
        let mut evaluations = 0u64;
        let mut energy_history = Vec::with_capacity(self.params.max_iterations as usize);
        let mut cvar_history = Vec::with_capacity(self.params.max_iterations as usize);
        let mut converged = false;
        let mut iterations = 0;
        let mut shots = Vec::with_capacity(self.params.shots);
        let mut tail = Vec::with_capacity(self.params.shots);

        for iteration in 0..self.params.max_iterations {
            iterations = iteration + 1;
            let p = probabilities(&theta);
            let energy = expected_energy(model, &p);

            shots.clear();
            for _ in 0..self.params.shots {
                let shot = Shot::draw(model, &p, &mut rng);
                evaluations += 1;
                if shot.energy < best_energy {
                    best_energy = shot.energy;
                    best = shot.bits.clone();
                }
                shots.push(shot);
            }
            // The most likely bitstring is always scored too.
            let mode: Vec<bool> = p.iter().map(|&pi| pi > 0.5).collect();
            let e = model.energy(&mode);
            evaluations += 1;
            if e < best_energy {
                best_energy = e;
                best = mode;
            }

            tail.clear();
            tail.extend(shots.iter().map(|s| s.energy));
            let batch_cvar = cvar(&mut tail, self.params.cvar_alpha);
            if let Some(c) = batch_cvar {
                cvar_history.push(c);
            }

            let previous = energy_history.last().copied();
            energy_history.push(energy);
            debug!(
                "Sampler iteration {}: <E> = {:.4}, CVaR {:?}, best sample {:.4}",
                iteration, energy, batch_cvar, best_energy
            );
            if let Some(prev) = previous {
                if (energy - prev).abs() < self.params.convergence_threshold {
                    converged = true;
                    break;
                }
            }

            let grad = cvar_gradient(model, &theta, &shots, self.params.cvar_alpha);
            for (t, g) in theta.iter_mut().zip(&grad) {
                *t = (*t - self.params.learning_rate * g).rem_euclid(2.0 * PI);
            }
        }

        SamplerRun {
            outcome: SolverOutcome::scored(model, best, evaluations, converged),
            energy_history,
            cvar_history,
            probabilities: probabilities(&theta),
            iterations,
        }
    }
}

impl QuboSolver for VariationalSampler {
    fn name(&self) -> &'static str {
        "sampler"
    }

    fn minimize(&self, model: &QuboModel) -> Result<SolverOutcome> {
        if model.is_empty() {
            return Ok(SolverOutcome::empty());
        }
        Ok(self.run(model).outcome)
    }
}
