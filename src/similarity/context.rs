//! Bag-of-words context for mentions and entities.
//!
//! Context extraction (tokenization, TF-IDF indexing) lives outside this
//! crate; the engine only needs term-weight vectors back. `ContextCache` is
//! the contract, `StaticContext` the in-memory reference implementation used
//! for testing and embedding.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::vector::cosine_sparse;
use crate::model::{Entity, Mention};

/// Sparse term-weight vector.
pub type ContextVector = HashMap<String, f32>;

// ============================================================================
// ContextCache trait
// ============================================================================

/// Provider of bag-of-words context, typically backed by a document text and
/// a TF-IDF index. Implementations cache per-document state and reset it in
/// `clear` between documents.
pub trait ContextCache {
    /// Context of the text surrounding a mention. `None` when nothing is
    /// known about the surface form.
    fn mention_context(&self, mention: &Mention) -> Option<ContextVector>;

    /// Context of a knowledge-base entity (e.g. its article text).
    fn entity_context(&self, entity: &Entity) -> Option<ContextVector>;

    /// Document-level TF-IDF importance of a mention's surface form.
    fn mention_tfidf(&self, _mention: &Mention) -> f64 {
        1.0
    }

    /// Reset per-document state.
    fn clear(&self);
}

/// Cosine similarity between a mention's context and an entity's context.
/// 0 when either side is unknown.
pub fn mention_entity_similarity(
    mention: &Mention,
    entity: &Entity,
    cache: &dyn ContextCache,
) -> f64 {
    match (cache.mention_context(mention), cache.entity_context(entity)) {
        (Some(m), Some(e)) => cosine_sparse(&m, &e),
        _ => 0.0,
    }
}

// ============================================================================
// StaticContext
// ============================================================================

/// In-memory context source keyed by surface form / entity name.
///
/// The reference implementation of `ContextCache`: fill it up front, point
/// the linker at it. Not a real TF-IDF index — lookups are exact-name only.
#[derive(Default)]
pub struct StaticContext {
    mentions: RwLock<HashMap<String, ContextVector>>,
    entities: RwLock<HashMap<String, ContextVector>>,
    tfidf: RwLock<HashMap<String, f64>>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mention_context<S: Into<String>>(
        &self,
        surface: impl Into<String>,
        terms: impl IntoIterator<Item = (S, f32)>,
    ) {
        self.mentions.write().insert(
            surface.into(),
            terms.into_iter().map(|(t, w)| (t.into(), w)).collect(),
        );
    }

    pub fn insert_entity_context<S: Into<String>>(
        &self,
        entity_name: impl Into<String>,
        terms: impl IntoIterator<Item = (S, f32)>,
    ) {
        self.entities.write().insert(
            entity_name.into(),
            terms.into_iter().map(|(t, w)| (t.into(), w)).collect(),
        );
    }

    pub fn set_mention_tfidf(&self, surface: impl Into<String>, weight: f64) {
        self.tfidf.write().insert(surface.into(), weight);
    }
}

impl ContextCache for StaticContext {
    fn mention_context(&self, mention: &Mention) -> Option<ContextVector> {
        self.mentions.read().get(&mention.name).cloned()
    }

    fn entity_context(&self, entity: &Entity) -> Option<ContextVector> {
        self.entities.read().get(&entity.name).cloned()
    }

    fn mention_tfidf(&self, mention: &Mention) -> f64 {
        self.tfidf.read().get(&mention.name).copied().unwrap_or(1.0)
    }

    fn clear(&self) {
        self.mentions.write().clear();
        self.entities.write().clear();
        self.tfidf.write().clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_through_cache() {
        let ctx = StaticContext::new();
        ctx.insert_mention_context("U of A", [("campus", 1.0f32), ("hockey", 1.0)]);
        ctx.insert_entity_context("University of Alberta", [("campus", 1.0f32)]);
        ctx.insert_entity_context("University of Arizona", [("desert", 1.0f32)]);

        let m = Mention::new(Entity::new("U of A"), 0, 1);
        let ua = Entity::new("University of Alberta");
        let az = Entity::new("University of Arizona");

        assert!(mention_entity_similarity(&m, &ua, &ctx) > 0.0);
        assert_eq!(mention_entity_similarity(&m, &az, &ctx), 0.0);
    }

    #[test]
    fn test_unknown_context_is_zero_similarity() {
        let ctx = StaticContext::new();
        let m = Mention::new(Entity::new("ghost"), 0, 1);
        assert_eq!(
            mention_entity_similarity(&m, &Entity::new("ghost"), &ctx),
            0.0
        );
    }

    #[test]
    fn test_clear_resets_state() {
        let ctx = StaticContext::new();
        ctx.insert_mention_context("x", [("a", 1.0f32)]);
        ctx.set_mention_tfidf("x", 3.0);
        ctx.clear();

        let m = Mention::new(Entity::new("x"), 0, 1);
        assert!(ctx.mention_context(&m).is_none());
        assert_eq!(ctx.mention_tfidf(&m), 1.0);
    }
}
