//! # Personalized PageRank Engine
//!
//! Computes stationary rank vectors over per-document subgraphs, restarting
//! from a caller-supplied preference distribution. Two engines share one
//! contract:
//!
//! | Engine | Solver | Graph input | Batch mode |
//! |--------|--------|-------------|------------|
//! | [`WeightedPageRank`] | power method | weighted edge list | worker pool, join-all |
//! | [`UnweightedPageRank`] | Gauss–Seidel | adjacency lists | sequential |
//!
//! Both are *strongly preferential*: rank mass leaving a dangling node
//! restarts into the preference vector rather than spreading uniformly. Both
//! stop on an L1 delta below [`DEFAULT_TOLERANCE`] or after
//! [`DEFAULT_MAX_ITERATIONS`] sweeps, whichever comes first — the low cap
//! trades exactness for speed, which is fine because disambiguation only
//! compares the shape of the top-ranked mass.

pub mod unweighted;
pub mod weighted;

use std::collections::{BTreeSet, HashMap};

pub use unweighted::UnweightedPageRank;
pub use weighted::WeightedPageRank;

/// Default damping factor.
pub const DEFAULT_ALPHA: f64 = 0.85;

/// Default L1 stopping threshold.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Default sweep cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// How far from 1.0 the L1 norm of a preference vector may drift.
pub const STOCHASTIC_TOLERANCE: f64 = 1e-10;

// ============================================================================
// PageRanker trait
// ============================================================================

/// The contract shared by both ranking engines. Callers pick a variant once
/// per document based on configuration.
pub trait PageRanker {
    fn set_alpha(&mut self, alpha: f64);

    /// Install the restart distribution. Callers are responsible for
    /// normalizing it first (see [`normalize`] / [`is_stochastic`]).
    fn set_preference(&mut self, preference: Vec<f64>);

    /// Install an explicit starting vector. Optional; the default start is
    /// the preference vector.
    fn set_start(&mut self, _start: Vec<f64>) {}

    /// Run the solver. `None` when the engine has no graph to rank.
    fn compute_rank(&mut self) -> Option<Vec<f64>>;

    /// One full rank vector per id, each restarting from that single node.
    /// An empty id set computes nothing and returns an empty map.
    fn compute_rank_parallel(&self, ids: &BTreeSet<u32>) -> HashMap<u32, Vec<f64>>;
}

// ============================================================================
// Vector helpers
// ============================================================================

/// Whether `v` is a probability distribution: L1 norm within
/// [`STOCHASTIC_TOLERANCE`] of 1.0. Kahan-summed so long vectors of tiny
/// entries do not accumulate rounding drift.
pub fn is_stochastic(v: &[f64]) -> bool {
    let mut norm = 0.0f64;
    let mut c = 0.0f64;
    for &x in v {
        let y = x - c;
        let t = norm + y;
        c = (t - norm) - y;
        norm = t;
    }
    (norm - 1.0).abs() <= STOCHASTIC_TOLERANCE
}

/// L1-normalize in place. A zero-mass vector is left untouched; callers fall
/// back to a uniform distribution in that case.
pub fn normalize(v: &mut [f64]) {
    let sum: f64 = v.iter().sum();
    if sum == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= sum;
    }
}

pub(crate) fn l1_delta(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

pub(crate) fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stochastic_accepts_unit_mass() {
        assert!(is_stochastic(&[0.25, 0.25, 0.25, 0.25]));
        assert!(is_stochastic(&[1.0]));
        // within tolerance
        assert!(is_stochastic(&[0.5, 0.5 + 5e-11]));
    }

    #[test]
    fn test_is_stochastic_rejects_half_and_excess_mass() {
        assert!(!is_stochastic(&[0.25, 0.25]));
        assert!(!is_stochastic(&[0.75, 0.75]));
        assert!(!is_stochastic(&[]));
    }

    #[test]
    fn test_is_stochastic_many_small_entries() {
        let v = vec![1.0 / 1_000_000.0; 1_000_000];
        assert!(is_stochastic(&v));
    }

    #[test]
    fn test_normalize() {
        let mut v = [2.0, 6.0];
        normalize(&mut v);
        assert_eq!(v, [0.25, 0.75]);
    }

    #[test]
    fn test_normalize_zero_mass_untouched() {
        let mut v = [0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, [0.0, 0.0]);
    }
}
