//! Candidate selection boundary and the per-document working set.
//!
//! Mapping a surface form to plausible entities (alias indexing, fuzzy
//! matching) is an external service; the engine consumes its output as
//! entity→prior maps. `StaticCandidates` is the in-memory reference
//! implementation used for testing and embedding.
//!
//! During disambiguation the candidates of a document live in
//! [`CandidateSet`]s — one per mention, explicitly pruned as decisions are
//! made, with a stable iteration order.

use std::collections::HashMap;

use crate::model::{Entity, Mention};

// ============================================================================
// CandidateSelection trait
// ============================================================================

/// External candidate-selection service.
pub trait CandidateSelection {
    /// Candidate entities for a name with prior probabilities, normalized
    /// over the returned set. Empty when the name is unknown.
    fn select(&self, name: &str) -> HashMap<Entity, f64>;

    /// Candidates for every mention, in mention order. The default asks for
    /// the believed entity name first and falls back to the surface form.
    fn select_mentions(&self, mentions: &[Mention]) -> Vec<HashMap<Entity, f64>> {
        mentions
            .iter()
            .map(|m| {
                let candidates = self.select(&m.entity.name);
                if candidates.is_empty() && m.name != m.entity.name {
                    self.select(&m.name)
                } else {
                    candidates
                }
            })
            .collect()
    }
}

// ============================================================================
// StaticCandidates
// ============================================================================

/// In-memory alias table. Priors are normalized per alias on lookup, so
/// callers can insert raw counts.
#[derive(Debug, Default)]
pub struct StaticCandidates {
    table: HashMap<String, Vec<(Entity, f64)>>,
}

impl StaticCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, entity: Entity, prior: f64) {
        self.table.entry(alias.into()).or_default().push((entity, prior));
    }
}

impl CandidateSelection for StaticCandidates {
    fn select(&self, name: &str) -> HashMap<Entity, f64> {
        let Some(entries) = self.table.get(name) else {
            return HashMap::new();
        };

        let total: f64 = entries.iter().map(|(_, p)| p).sum();
        if total <= 0.0 {
            return HashMap::new();
        }
        entries
            .iter()
            .map(|(e, p)| (e.clone(), p / total))
            .collect()
    }
}

// ============================================================================
// CandidateSet
// ============================================================================

/// One mention's surviving candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub entity: Entity,
    pub prior: f64,
}

/// The working set for a mention: candidates ordered by descending prior
/// (name-tie-broken), shrunk in place as the pipeline eliminates them.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
}

impl CandidateSet {
    /// Build from a service response, establishing the deterministic order.
    pub fn from_priors(priors: HashMap<Entity, f64>) -> Self {
        let mut items: Vec<Candidate> = priors
            .into_iter()
            .map(|(entity, prior)| Candidate { entity, prior })
            .collect();
        items.sort_by(|a, b| {
            b.prior
                .total_cmp(&a.prior)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    /// The single remaining candidate, if exactly one survives.
    pub fn sole(&self) -> Option<&Candidate> {
        (self.items.len() == 1).then(|| &self.items[0])
    }

    pub fn first(&self) -> Option<&Candidate> {
        self.items.first()
    }

    pub fn prior_of(&self, entity: &Entity) -> Option<f64> {
        self.items
            .iter()
            .find(|c| &c.entity == entity)
            .map(|c| c.prior)
    }

    /// Drop every candidate the predicate rejects.
    pub fn retain(&mut self, keep: impl FnMut(&Candidate) -> bool) {
        self.items.retain(keep);
    }

    /// Keep only the given entity (with its recorded prior).
    pub fn keep_only(&mut self, entity: &Entity) {
        self.items.retain(|c| &c.entity == entity);
    }

    /// Drop every candidate; the mention resolves to nothing.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_static_candidates_normalize_priors() {
        let mut cs = StaticCandidates::new();
        cs.insert("paris", Entity::new("Paris"), 30.0);
        cs.insert("paris", Entity::new("Paris, Texas"), 10.0);

        let selected = cs.select("paris");
        assert_eq!(selected.len(), 2);
        assert!((selected[&Entity::new("Paris")] - 0.75).abs() < 1e-12);
        assert!((selected[&Entity::new("Paris, Texas")] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_alias_is_empty() {
        let cs = StaticCandidates::new();
        assert!(cs.select("nope").is_empty());
    }

    #[test]
    fn test_select_mentions_falls_back_to_surface_form() {
        let mut cs = StaticCandidates::new();
        cs.insert("UofA", Entity::new("University of Alberta"), 1.0);

        // believed entity name unknown, surface form known
        let mention = Mention::new(Entity::new("SomethingElse"), 0, 1).with_name("UofA");
        let selected = cs.select_mentions(&[mention]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].len(), 1);
    }

    #[test]
    fn test_candidate_set_orders_by_descending_prior() {
        let mut priors = HashMap::new();
        priors.insert(Entity::new("B"), 0.2);
        priors.insert(Entity::new("A"), 0.7);
        priors.insert(Entity::new("C"), 0.1);

        let set = CandidateSet::from_priors(priors);
        let names: Vec<&str> = set.iter().map(|c| c.entity.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_keep_only_and_sole() {
        let mut priors = HashMap::new();
        priors.insert(Entity::new("A"), 0.7);
        priors.insert(Entity::new("B"), 0.3);
        let mut set = CandidateSet::from_priors(priors);

        assert!(set.sole().is_none());
        set.keep_only(&Entity::new("A"));
        assert_eq!(set.sole().unwrap().entity.name, "A");
    }
}
