//! Exact minimum-cardinality refinement of the greedy pool.
//!
//! Integer program over the pooled candidates only:
//!
//! ```text
//! minimize    sum_i x_i
//! subject to  sum_{i covers p} x_i >= 1     for every demand point p the greedy stage covered
//!             x_i in {0, 1}
//! ```
//!
//! Solved by depth-first branch-and-bound. Each node branches on the
//! uncovered constraint with the fewest usable covering candidates; siblings
//! exclude the candidates tried before them so no subset is visited twice.
//! Nodes are pruned with the bound `chosen + ceil(uncovered / best_single_gain)`.
//! The incumbent starts from a reverse-delete pass over the greedy pool, so a
//! feasible answer exists even when the node budget runs out.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RefineSettings;
use crate::coverage::CoverageMatrix;
use crate::error::OpticError;
use crate::greedy::{CandidatePool, GreedySelection};

/// Outcome of the refinement stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum RefineStatus {
    /// Proven minimum
    Optimal,
    /// Node budget exhausted; best pool found so far
    BudgetExhausted,
    /// Refinement failed; the greedy pool is passed through unchanged
    Fallback(String),
    /// Refinement disabled by configuration
    Skipped,
}

/// Output of the refinement stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    /// Refined pool, a subset of the greedy pool in greedy order
    pub pool: CandidatePool,
    pub status: RefineStatus,
    /// Covering constraints in the program
    pub constraints: usize,
    /// Greedy-covered demand points no pooled candidate covers; excluded
    /// from the program and reported
    pub excluded_points: Vec<u32>,
    pub nodes_explored: u64,
}

/// Fixed-width bitset over constraint indices
#[derive(Debug, Clone, PartialEq, Eq)]
struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    fn empty(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    fn full(bits: usize) -> Self {
        let mut set = Self::empty(bits);
        for i in 0..bits {
            set.insert(i);
        }
        set
    }

    #[inline]
    fn insert(&mut self, i: usize) {
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    #[inline]
    fn contains(&self, i: usize) -> bool {
        self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    fn intersection_count(&self, other: &Self) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    fn difference(&self, other: &Self) -> Self {
        Self {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| a & !b)
                .collect(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            (0..64)
                .filter(move |b| word & (1u64 << b) != 0)
                .map(move |b| w * 64 + b)
        })
    }
}

/// Branch-and-bound search state
struct Search<'a> {
    /// Constraint coverage per pool member
    cover: &'a [BitSet],
    /// Pool members covering each constraint
    coverers: &'a [Vec<usize>],
    best: Vec<usize>,
    nodes: u64,
    max_nodes: u64,
    exhausted: bool,
}

impl Search<'_> {
    fn run(&mut self, uncovered: &BitSet, chosen: &mut Vec<usize>, banned: &mut [bool]) {
        if self.nodes >= self.max_nodes {
            self.exhausted = true;
            return;
        }
        self.nodes += 1;

        if uncovered.is_empty() {
            if chosen.len() < self.best.len() {
                self.best = chosen.clone();
                debug!("Refiner incumbent improved to {} sites", chosen.len());
            }
            return;
        }

        let remaining = uncovered.count();
        let max_gain = (0..self.cover.len())
            .filter(|&i| !banned[i])
            .map(|i| self.cover[i].intersection_count(uncovered))
            .max()
            .unwrap_or(0);
        if max_gain == 0 {
            return;
        }
        if chosen.len() + remaining.div_ceil(max_gain) >= self.best.len() {
            return;
        }

        // Branch on the most constrained uncovered point.
        let mut pivot: Option<(usize, usize)> = None;
        for p in uncovered.iter() {
            let usable = self.coverers[p].iter().filter(|&&i| !banned[i]).count();
            if usable == 0 {
                return;
            }
            if pivot.map_or(true, |(_, n)| usable < n) {
                pivot = Some((p, usable));
            }
        }
        let Some((pivot, _)) = pivot else {
            return;
        };

        let mut options: Vec<(usize, usize)> = self.coverers[pivot]
            .iter()
            .filter(|&&i| !banned[i])
            .map(|&i| (i, self.cover[i].intersection_count(uncovered)))
            .collect();
        options.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut newly_banned = Vec::with_capacity(options.len());
        for (i, _) in options {
            chosen.push(i);
            let next = uncovered.difference(&self.cover[i]);
            self.run(&next, chosen, banned);
            chosen.pop();
            banned[i] = true;
            newly_banned.push(i);
            if self.exhausted {
                break;
            }
        }
        for i in newly_banned {
            banned[i] = false;
        }
    }
}

/// Minimum-cardinality exact refiner
#[derive(Debug, Clone)]
pub struct ExactRefiner {
    enabled: bool,
    max_nodes: u64,
}

impl ExactRefiner {
    pub fn new(settings: &RefineSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_nodes: settings.max_nodes,
        }
    }

    /// Shrink the greedy pool while keeping every greedy-covered point covered.
    ///
    /// `matrix` must be the coverage matrix the greedy stage ran on.
    pub fn refine(&self, greedy: &GreedySelection, matrix: &CoverageMatrix) -> Refinement {
        let pool = &greedy.pool;
        if !self.enabled {
            return Refinement {
                pool: pool.clone(),
                status: RefineStatus::Skipped,
                constraints: 0,
                excluded_points: Vec::new(),
                nodes_explored: 0,
            };
        }

        // Pool members covering each greedy-covered demand point.
        let mut by_point: Vec<Vec<usize>> = vec![Vec::new(); matrix.num_points()];
        for (member, cand) in pool.members().iter().enumerate() {
            for &p in matrix.covered_by(cand.position) {
                by_point[p as usize].push(member);
            }
        }
        let mut coverers: Vec<Vec<usize>> = Vec::new();
        let mut excluded_points = Vec::new();
        for (p, covering) in by_point.into_iter().enumerate() {
            if !greedy.covered.get(p).copied().unwrap_or(false) {
                continue;
            }
            if covering.is_empty() {
                excluded_points.push(p as u32);
            } else {
                coverers.push(covering);
            }
        }
        if !excluded_points.is_empty() {
            warn!(
                "{}; excluded from the refinement program",
                OpticError::infeasible_constraint(excluded_points.len())
            );
        }

        let m = coverers.len();
        let mut cover = vec![BitSet::empty(m); pool.len()];
        for (c, covering) in coverers.iter().enumerate() {
            for &member in covering {
                cover[member].insert(c);
            }
        }

        let all = BitSet::full(m);
        let initial = reverse_delete(&cover, &all);
        let Some(initial) = initial else {
            warn!("Refinement program is infeasible; keeping the greedy pool");
            return Refinement {
                pool: pool.clone(),
                status: RefineStatus::Fallback("covering program infeasible".into()),
                constraints: m,
                excluded_points,
                nodes_explored: 0,
            };
        };

        let mut search = Search {
            cover: &cover,
            coverers: &coverers,
            best: initial,
            nodes: 0,
            max_nodes: self.max_nodes,
            exhausted: false,
        };
        let mut banned = vec![false; pool.len()];
        search.run(&all, &mut Vec::new(), &mut banned);

        let mut keep = vec![false; pool.len()];
        for &i in &search.best {
            keep[i] = true;
        }
        let still_covered = search
            .best
            .iter()
            .fold(BitSet::empty(m), |acc, &i| BitSet {
                words: acc.words.iter().zip(&cover[i].words).map(|(a, b)| a | b).collect(),
            });
        if still_covered.count() != m {
            warn!("Refined pool lost coverage; keeping the greedy pool");
            return Refinement {
                pool: pool.clone(),
                status: RefineStatus::Fallback("refined pool does not cover all constraints".into()),
                constraints: m,
                excluded_points,
                nodes_explored: search.nodes,
            };
        }

        let status = if search.exhausted {
            warn!(
                "Refiner node budget ({}) exhausted; using best pool found",
                self.max_nodes
            );
            RefineStatus::BudgetExhausted
        } else {
            RefineStatus::Optimal
        };
        let refined = pool.retain_indices(|i| keep[i]);
        info!(
            "Refined pool: {} candidates (reduced from {}), {} constraints, {} nodes",
            refined.len(),
            pool.len(),
            m,
            search.nodes
        );

        Refinement {
            pool: refined,
            status,
            constraints: m,
            excluded_points,
            nodes_explored: search.nodes,
        }
    }
}

/// Drop members, last first, whenever the rest still cover `required`.
/// Returns `None` when even the whole pool falls short.
fn reverse_delete(cover: &[BitSet], required: &BitSet) -> Option<Vec<usize>> {
    let count_covering = |active: &[bool], c: usize| {
        (0..cover.len())
            .filter(|&i| active[i] && cover[i].contains(c))
            .count()
    };
    let mut active = vec![true; cover.len()];
    if required.iter().any(|c| count_covering(&active, c) == 0) {
        return None;
    }
    for i in (0..cover.len()).rev() {
        active[i] = false;
        if cover[i].iter().any(|c| count_covering(&active, c) == 0) {
            active[i] = true;
        }
    }
    Some((0..cover.len()).filter(|&i| active[i]).collect())
}
