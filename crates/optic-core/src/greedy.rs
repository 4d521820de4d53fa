//! Maximum-coverage greedy set cover.
//!
//! Each round picks the unselected site that newly covers the most
//! still-uncovered demand points, lowest id first on ties, until the coverage
//! target is met, no site adds coverage, or the pool is full.
//!
//! Marginal gains only shrink as coverage grows, so the stored gain of a site
//! is an upper bound on its current gain. Sites sit in a max-heap keyed on
//! `(gain, Reverse(position))` and are re-evaluated lazily when they reach the
//! top: a refreshed site that still orders at or above the next stored bound
//! is the exact arg-max, including the id tie-break.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::SiteCatalog;
use crate::config::CoverageSettings;
use crate::coverage::CoverageMatrix;
use crate::error::{OpticError, Result};

/// A pooled site: its raw-table id and its position in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub id: usize,
    pub position: usize,
}

/// Ordered, duplicate-free working set of candidate sites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePool {
    members: Vec<Candidate>,
}

impl CandidatePool {
    /// Pool from catalog positions, in the given order.
    pub fn from_positions(catalog: &SiteCatalog, positions: &[usize]) -> Result<Self> {
        let mut seen = vec![false; catalog.len()];
        let mut members = Vec::with_capacity(positions.len());
        for &pos in positions {
            let site = catalog.sites().get(pos).ok_or_else(|| {
                OpticError::validation(format!(
                    "catalog position {} out of range for {} sites",
                    pos,
                    catalog.len()
                ))
            })?;
            if std::mem::replace(&mut seen[pos], true) {
                return Err(OpticError::validation(format!(
                    "site {} appears twice in the candidate pool",
                    site.id
                )));
            }
            members.push(Candidate {
                id: site.id,
                position: pos,
            });
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    /// Raw-table ids in pool order
    pub fn ids(&self) -> Vec<usize> {
        self.members.iter().map(|c| c.id).collect()
    }

    /// Catalog positions in pool order
    pub fn positions(&self) -> Vec<usize> {
        self.members.iter().map(|c| c.position).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Keep only members whose pool index satisfies `keep`, preserving order.
    pub fn retain_indices(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let members = self
            .members
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, c)| *c)
            .collect();
        Self { members }
    }
}

/// Why the greedy loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreedyStop {
    /// Coverage reached `min_coverage_pct`
    TargetReached,
    /// No remaining site adds coverage; the target is unreachable
    NoGain,
    /// The pool reached `candidate_limit`
    CandidateLimit,
}

/// Output of the greedy stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedySelection {
    /// Selected sites in selection order
    pub pool: CandidatePool,
    /// Per demand point: covered by at least one selected site
    pub covered: Vec<bool>,
    /// Covered fraction of demand (1.0 for an empty demand set)
    pub coverage_fraction: f64,
    /// Covered fraction after each pick
    pub coverage_history: Vec<f64>,
    pub stop: GreedyStop,
}

impl GreedySelection {
    /// Whether the coverage target was met
    pub fn target_met(&self) -> bool {
        self.stop == GreedyStop::TargetReached
    }

    /// Number of covered demand points
    pub fn covered_count(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }
}

/// Greedy maximum-coverage selector
#[derive(Debug, Clone)]
pub struct GreedySelector {
    min_coverage_pct: f64,
    candidate_limit: usize,
}

impl GreedySelector {
    pub fn new(settings: &CoverageSettings) -> Self {
        Self {
            min_coverage_pct: settings.min_coverage_pct,
            candidate_limit: settings.candidate_limit,
        }
    }

    /// Run the selection over a precomputed coverage matrix whose rows are
    /// aligned with `catalog.sites()`.
    pub fn select(&self, catalog: &SiteCatalog, matrix: &CoverageMatrix) -> Result<GreedySelection> {
        if matrix.num_sites() != catalog.len() {
            return Err(OpticError::shape(catalog.len(), matrix.num_sites()));
        }
        let n_points = matrix.num_points();
        let mut covered = vec![false; n_points];
        let mut covered_count = 0usize;
        let mut history = Vec::new();
        let mut picked: Vec<usize> = Vec::new();
        let fraction = |count: usize| {
            if n_points == 0 {
                1.0
            } else {
                count as f64 / n_points as f64
            }
        };

        let mut heap: BinaryHeap<(usize, Reverse<usize>)> = (0..matrix.num_sites())
            .map(|pos| (matrix.covered_by(pos).len(), Reverse(pos)))
            .filter(|&(gain, _)| gain > 0)
            .collect();

        let stop = loop {
            if fraction(covered_count) >= self.min_coverage_pct {
                break GreedyStop::TargetReached;
            }
            if picked.len() >= self.candidate_limit {
                break GreedyStop::CandidateLimit;
            }

            let chosen = loop {
                let Some((_, Reverse(pos))) = heap.pop() else {
                    break None;
                };
                let gain = matrix
                    .covered_by(pos)
                    .iter()
                    .filter(|&&p| !covered[p as usize])
                    .count();
                if gain == 0 {
                    continue;
                }
                let fresh = (gain, Reverse(pos));
                match heap.peek() {
                    Some(next) if *next > fresh => heap.push(fresh),
                    _ => break Some((pos, gain)),
                }
            };

            let Some((pos, gain)) = chosen else {
                break GreedyStop::NoGain;
            };
            for &p in matrix.covered_by(pos) {
                if !covered[p as usize] {
                    covered[p as usize] = true;
                    covered_count += 1;
                }
            }
            picked.push(pos);
            history.push(fraction(covered_count));
            debug!(
                "Greedy pick #{}: site {} (+{} points, coverage {:.1}%)",
                picked.len(),
                catalog.sites()[pos].id,
                gain,
                fraction(covered_count) * 100.0
            );
        };

        let pool = CandidatePool::from_positions(catalog, &picked)?;
        let coverage_fraction = fraction(covered_count);
        info!(
            "Greedy selected {} candidates providing {:.1}% coverage",
            pool.len(),
            coverage_fraction * 100.0
        );
        if stop != GreedyStop::TargetReached {
            warn!(
                "Partial coverage: {:.1}% below target {:.1}% ({:?})",
                coverage_fraction * 100.0,
                self.min_coverage_pct * 100.0,
                stop
            );
        }

        Ok(GreedySelection {
            pool,
            covered,
            coverage_fraction,
            coverage_history: history,
            stop,
        })
    }
}
