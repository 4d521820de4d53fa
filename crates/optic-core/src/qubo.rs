//! Interference-aware QUBO over the refined candidate pool.
//!
//! ```text
//! E(x) = sum_i h_i x_i + sum_{i<j} J_ij x_i x_j
//! h_i  = power_cost_weight * P_watts(i) - coverage_reward
//! J_ij = penalty_weight   iff distance(i, j) < interference_threshold
//! ```
//!
//! Quadratic terms are stored sparsely; the dense matrix is only built on
//! request for diagnostics.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::catalog::SiteCatalog;
use crate::config::QuboSettings;
use crate::coverage::CoverageModel;
use crate::error::{OpticError, Result};
use crate::greedy::CandidatePool;

/// Sparse quadratic unconstrained binary model.
///
/// Variable `i` corresponds to the `i`-th candidate of the pool the model was
/// built from; `candidate_ids()[i]` is that candidate's raw-table id.
#[derive(Debug, Clone, PartialEq)]
pub struct QuboModel {
    candidate_ids: Vec<usize>,
    linear: Vec<f64>,
    /// Keys are `(i, j)` with `i < j`
    quadratic: BTreeMap<(usize, usize), f64>,
    neighbours: Vec<Vec<(usize, f64)>>,
}

impl QuboModel {
    /// Build a model from explicit coefficients.
    ///
    /// Pair keys may be given in either order; repeated pairs are summed.
    pub fn new(
        candidate_ids: Vec<usize>,
        linear: Vec<f64>,
        pairs: impl IntoIterator<Item = ((usize, usize), f64)>,
    ) -> Result<Self> {
        if candidate_ids.len() != linear.len() {
            return Err(OpticError::shape(candidate_ids.len(), linear.len()));
        }
        if let Some(bad) = linear.iter().find(|h| !h.is_finite()) {
            return Err(OpticError::invalid_parameter(
                "linear",
                format!("coefficients must be finite, got {}", bad),
            ));
        }
        let n = linear.len();
        let mut quadratic = BTreeMap::new();
        for ((a, b), w) in pairs {
            if a == b || a >= n || b >= n {
                return Err(OpticError::invalid_parameter(
                    "quadratic",
                    format!("pair ({}, {}) is not a distinct pair of {} variables", a, b, n),
                ));
            }
            if !w.is_finite() {
                return Err(OpticError::invalid_parameter(
                    "quadratic",
                    format!("coefficient for ({}, {}) must be finite", a, b),
                ));
            }
            *quadratic.entry((a.min(b), a.max(b))).or_insert(0.0) += w;
        }
        let mut model = Self {
            candidate_ids,
            linear,
            quadratic,
            neighbours: Vec::new(),
        };
        model.index_neighbours();
        Ok(model)
    }

    /// Model over anonymous variables `0..n`, ids equal to indices
    pub fn from_coefficients(
        linear: Vec<f64>,
        pairs: impl IntoIterator<Item = ((usize, usize), f64)>,
    ) -> Result<Self> {
        let ids = (0..linear.len()).collect();
        Self::new(ids, linear, pairs)
    }

    fn index_neighbours(&mut self) {
        let mut neighbours = vec![Vec::new(); self.linear.len()];
        for (&(i, j), &w) in &self.quadratic {
            neighbours[i].push((j, w));
            neighbours[j].push((i, w));
        }
        self.neighbours = neighbours;
    }

    pub fn num_vars(&self) -> usize {
        self.linear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }

    pub fn candidate_ids(&self) -> &[usize] {
        &self.candidate_ids
    }

    pub fn linear(&self) -> &[f64] {
        &self.linear
    }

    /// Quadratic terms keyed by `(i, j)`, `i < j`
    pub fn quadratic(&self) -> &BTreeMap<(usize, usize), f64> {
        &self.quadratic
    }

    pub fn num_quadratic_terms(&self) -> usize {
        self.quadratic.len()
    }

    /// Coupling between two variables, zero when absent
    pub fn coupling(&self, i: usize, j: usize) -> f64 {
        self.quadratic
            .get(&(i.min(j), i.max(j)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Objective value of an assignment.
    ///
    /// # Panics
    ///
    /// If `x.len() != self.num_vars()`.
    pub fn energy(&self, x: &[bool]) -> f64 {
        assert_eq!(x.len(), self.linear.len(), "assignment length mismatch");
        let linear: f64 = self
            .linear
            .iter()
            .zip(x)
            .filter(|(_, &on)| on)
            .map(|(h, _)| h)
            .sum();
        let quadratic: f64 = self
            .quadratic
            .iter()
            .filter(|(&(i, j), _)| x[i] && x[j])
            .map(|(_, w)| w)
            .sum();
        linear + quadratic
    }

    /// Change in energy from flipping bit `i` of `x`. O(degree of `i`).
    #[inline]
    pub fn flip_delta(&self, x: &[bool], i: usize) -> f64 {
        let field = self.linear[i]
            + self.neighbours[i]
                .iter()
                .filter(|&&(j, _)| x[j])
                .map(|&(_, w)| w)
                .sum::<f64>();
        if x[i] {
            -field
        } else {
            field
        }
    }

    /// Assignment activating exactly the variables with negative linear term.
    ///
    /// This is the exact minimizer whenever no quadratic term is positive.
    pub fn negative_linear_assignment(&self) -> Vec<bool> {
        self.linear.iter().map(|&h| h < 0.0).collect()
    }

    /// Upper-triangular dense matrix with the linear terms on the diagonal.
    /// For visualization only.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.linear.len();
        let mut q = vec![vec![0.0; n]; n];
        for (i, &h) in self.linear.iter().enumerate() {
            q[i][i] = h;
        }
        for (&(i, j), &w) in &self.quadratic {
            q[i][j] = w;
        }
        q
    }
}

/// Builds the QUBO for a candidate pool
#[derive(Debug, Clone)]
pub struct QuboBuilder {
    settings: QuboSettings,
}

impl QuboBuilder {
    pub fn new(settings: &QuboSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Activation cost of one site: weighted transmit power in watts
    #[inline]
    pub fn activation_cost(&self, tx_power_dbm: f64) -> f64 {
        self.settings.power_cost_weight * 10f64.powf((tx_power_dbm - 30.0) / 10.0)
    }

    /// Build the model for `pool`, using `model`'s metric for pair distances.
    ///
    /// The pair scan runs in parallel over the first index; pairs come back in
    /// index order, so coefficients do not depend on scheduling.
    pub fn build(
        &self,
        catalog: &SiteCatalog,
        pool: &CandidatePool,
        model: &CoverageModel,
    ) -> Result<QuboModel> {
        let sites = pool
            .members()
            .iter()
            .map(|c| {
                catalog.sites().get(c.position).ok_or_else(|| {
                    OpticError::validation(format!(
                        "candidate position {} out of range for {} sites",
                        c.position,
                        catalog.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let linear: Vec<f64> = sites
            .iter()
            .map(|s| self.activation_cost(s.tx_power_dbm) - self.settings.coverage_reward)
            .collect();

        let threshold = self.settings.interference_threshold;
        let penalty = self.settings.penalty_weight;
        let pairs: Vec<((usize, usize), f64)> = (0..sites.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let sites = &sites;
                (i + 1..sites.len())
                    .filter(move |&j| model.interferes(sites[i], sites[j], threshold))
                    .map(move |j| ((i, j), penalty))
            })
            .collect();
        debug!(
            "Interference scan: {} of {} pairs below {}",
            pairs.len(),
            sites.len() * sites.len().saturating_sub(1) / 2,
            threshold
        );

        let qubo = QuboModel::new(pool.ids(), linear, pairs)?;
        info!(
            "QUBO: {} variables, {} interference terms",
            qubo.num_vars(),
            qubo.num_quadratic_terms()
        );
        Ok(qubo)
    }
}
