//! Vector-space similarity and divergence.

use std::collections::HashMap;

/// Fixed divergence penalty for rank mass the document signature lacks.
pub const KL_GAMMA: f64 = 10.0;

/// Document-signature entries at or below this count as "missing".
pub const KL_EPSILON: f64 = 1e-6;

/// Cosine similarity between sparse bag-of-words vectors.
pub fn cosine_sparse(v1: &HashMap<String, f32>, v2: &HashMap<String, f32>) -> f64 {
    let mut dot = 0.0f64;
    let mut norm1 = 0.0f64;
    for (term, &w1) in v1 {
        if let Some(&w2) = v2.get(term) {
            dot += f64::from(w1) * f64::from(w2);
        }
        norm1 += f64::from(w1) * f64::from(w1);
    }

    let norm2: f64 = v2.values().map(|&w| f64::from(w) * f64::from(w)).sum();
    if norm1 == 0.0 || norm2 == 0.0 {
        return 0.0;
    }

    dot / (norm1.sqrt() * norm2.sqrt())
}

/// Cosine similarity between dense vectors over the same index space.
/// Length mismatch answers 0.
pub fn cosine(v1: &[f64], v2: &[f64]) -> f64 {
    if v1.len() != v2.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm1 = 0.0;
    let mut norm2 = 0.0;
    for (x, y) in v1.iter().zip(v2) {
        dot += x * y;
        norm1 += x * x;
        norm2 += y * y;
    }

    if norm1 == 0.0 || norm2 == 0.0 {
        return 0.0;
    }
    dot / (norm1.sqrt() * norm2.sqrt())
}

/// Zero-aware KL divergence of `p` from `q`, in bits.
///
/// Terms where `p[i]` is zero contribute nothing. Where `q[i]` is zero or
/// near-zero the log ratio would blow up, so the term is replaced by the
/// fixed penalty `p[i] * KL_GAMMA`. Mismatched lengths answer 0 — the caller
/// discards such comparisons.
pub fn zero_kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    if p.len() != q.len() {
        return 0.0;
    }

    let mut divergence = 0.0;
    for (&pi, &qi) in p.iter().zip(q) {
        if pi == 0.0 {
            continue;
        }
        if qi <= KL_EPSILON {
            divergence += pi * KL_GAMMA;
        } else {
            divergence += pi * (pi / qi).log2();
        }
    }
    divergence
}

// ============================================================================
// Tests
// ============================================================================
