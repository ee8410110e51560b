//! Supervised ranking and NIL prediction boundaries.
//!
//! Both models are trained and served outside this crate; the engine only
//! calls them with the feature vectors it extracted. Either may be absent —
//! the unsupervised scorer and a pass-through NIL gate are the defaults.

use crate::features::Feature;

/// A learned ranking model over a mention's candidate features.
pub trait CandidateRanker {
    /// Index of the candidate to link, or `None` for "no candidate".
    fn predict(&self, features: &[Feature]) -> Option<usize>;
}

/// A learned binary classifier deciding whether the chosen candidate is a
/// real referent.
pub trait NilClassifier {
    /// `true` when the mention should resolve to NIL despite the choice.
    fn is_nil(&self, feature: &Feature) -> bool;
}
