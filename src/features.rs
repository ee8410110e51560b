//! Per-candidate feature vectors and their ranking strategies.
//!
//! Each mention/candidate pair produces one [`Feature`]; the unsupervised
//! ranker normalizes each feature column across the mention's candidates and
//! picks the maximum under a [`FeatureComparator`] — the comparison strategy
//! is chosen once from configuration and injected into the ranking step.

use std::cmp::Ordering;

use crate::config::RankScheme;

/// Features of one mention/candidate pair. Ephemeral: produced and consumed
/// within a single disambiguation step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Feature {
    /// Prior probability of the candidate given the surface form.
    pub prior: f64,
    /// Local context similarity (cosine over bag-of-words contexts).
    pub local: f64,
    /// Semantic similarity: reciprocal divergence of the candidate's
    /// signature from the document signature.
    pub sem_sim: f64,
    /// Character-bigram similarity of the lower-cased names.
    pub name_sim: f64,
}

/// Mixing weights for the `Linear` and `Multiply` schemes.
#[derive(Debug, Clone, Copy)]
pub struct FeatureWeights {
    pub prior: f64,
    pub local: f64,
}

// ============================================================================
// Column normalization
// ============================================================================

/// Min–max normalize each feature column across the candidate list, so
/// features on wildly different scales (priors vs reciprocal divergences)
/// compare fairly. A constant column is left as-is.
pub fn normalize_columns(features: &mut [Feature]) {
    let columns: [fn(&mut Feature) -> &mut f64; 4] = [
        |f| &mut f.prior,
        |f| &mut f.local,
        |f| &mut f.sem_sim,
        |f| &mut f.name_sim,
    ];
    for select in columns {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for f in features.iter_mut() {
            let v = *select(f);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if !(hi > lo) || !hi.is_finite() || !lo.is_finite() {
            continue;
        }
        for f in features.iter_mut() {
            let slot = select(f);
            *slot = (*slot - lo) / (hi - lo);
        }
    }
}

// ============================================================================
// FeatureComparator
// ============================================================================

/// Compares two candidates' features under a configured [`RankScheme`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureComparator {
    scheme: RankScheme,
    weights: FeatureWeights,
}

impl FeatureComparator {
    pub fn new(scheme: RankScheme, weights: FeatureWeights) -> Self {
        Self { scheme, weights }
    }

    pub fn compare(&self, a: &Feature, b: &Feature) -> Ordering {
        match self.scheme {
            RankScheme::Vote => Self::compare_vote(a, b),
            _ => self.score(a).total_cmp(&self.score(b)),
        }
    }

    /// Index of the best feature vector; ties keep the earliest (and the
    /// candidate list is ordered by descending prior).
    pub fn best(&self, features: &[Feature]) -> Option<usize> {
        let mut best = 0;
        for (i, f) in features.iter().enumerate().skip(1) {
            if self.compare(&features[best], f) == Ordering::Less {
                best = i;
            }
        }
        (!features.is_empty()).then_some(best)
    }

    fn score(&self, f: &Feature) -> f64 {
        let FeatureWeights { prior, local } = self.weights;
        match self.scheme {
            RankScheme::Semantic => f.sem_sim,
            RankScheme::PriorSem => f.prior * f.sem_sim,
            RankScheme::LocalSem => f.local * f.sem_sim,
            RankScheme::NoisyOr => 1.0 - (1.0 - f.prior) * (1.0 - f.local) * (1.0 - f.sem_sim),
            RankScheme::Linear => {
                let sem = 1.0 - prior - local;
                prior * f.prior + local * f.local + sem * f.sem_sim
            }
            RankScheme::Multiply => {
                prior * f.prior * f.sem_sim + (1.0 - prior) * f.local * f.sem_sim
            }
            // scored schemes only; Vote is handled in compare()
            RankScheme::Vote => 0.0,
        }
    }

    /// 2-of-3 majority over the prior, local and semantic columns.
    fn compare_vote(a: &Feature, b: &Feature) -> Ordering {
        if a.prior == b.prior && a.local == b.local && a.sem_sim == b.sem_sim {
            return Ordering::Equal;
        }

        let mut votes = 0;
        if a.prior > b.prior {
            votes += 1;
        }
        if a.local > b.local {
            votes += 1;
        }
        if a.sem_sim > b.sem_sim {
            votes += 1;
        }

        if votes >= 2 {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
