//! # Disambiguation Orchestrator
//!
//! Drives the whole per-document pipeline: candidate selection, weight
//! caching, subgraph construction, signature computation, and the
//! mention-by-mention resolution loop.
//!
//! Two orchestration modes exist and are deliberately kept separate:
//!
//! - **iterative** — mentions are resolved from least to most ambiguous and
//!   every decision joins the believed-entity set, so the document signature
//!   sharpens as resolution proceeds;
//! - **one-shot** — the believed-entity set is fixed up front and every
//!   ambiguous mention is scored against the same evolving-free signature.
//!
//! The modes diverge subtly in when the approximate fallback distribution is
//! computed and whether decisions feed back; neither subsumes the other.
//!
//! Per-mention failures never abort a document: a mention with no usable
//! candidate resolves to `None` and processing continues. A document with no
//! usable candidates at all short-circuits to all-`None`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::candidate::{CandidateSelection, CandidateSet};
use crate::config::{LinkerConfig, PrefStrategy};
use crate::features::{normalize_columns, Feature, FeatureComparator, FeatureWeights};
use crate::graph::subgraph::{NameIdMap, SubgraphGenerator};
use crate::graph::GraphStore;
use crate::model::{Entity, Mention};
use crate::predict::{CandidateRanker, NilClassifier};
use crate::rank::{is_stochastic, normalize, PageRanker, UnweightedPageRank, WeightedPageRank};
use crate::similarity::context::{mention_entity_similarity, ContextCache};
use crate::similarity::string::ngram_similarity;
use crate::similarity::vector::zero_kl_divergence;

/// Divergences below this count as "identical to the document signature";
/// keeps the reciprocal finite.
const MIN_DIVERGENCE: f64 = 1e-12;

/// Semantic signatures keyed by dense node id.
type Signatures = HashMap<u32, Vec<f64>>;

/// The running believed-entity distribution: entity name → weight.
type BelievedEntities = BTreeMap<String, f64>;

// ============================================================================
// Weight cache
// ============================================================================

/// Cross-cutting weights computed once per document: mention importance,
/// per-candidate context similarity, and random draws for the `Random`
/// strategy. Avoids re-running context lookups inside the resolution loop.
pub(crate) struct WeightCache {
    random: HashMap<Entity, f64>,
    mention_weights: Vec<f64>,
    local_sim: Vec<HashMap<Entity, f64>>,
}

impl WeightCache {
    pub(crate) fn prepare(
        config: &LinkerConfig,
        mentions: &[Mention],
        cands: &[CandidateSet],
        context: &dyn ContextCache,
    ) -> Self {
        // mention importance
        let mention_weights: Vec<f64> = match config.mention_pref {
            PrefStrategy::Tfidf => mentions.iter().map(|m| context.mention_tfidf(m)).collect(),
            _ => vec![1.0; mentions.len()],
        };

        // one random draw per candidate entity
        let mut random = HashMap::new();
        if config.randomized() {
            let mut rng = match config.random_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            for set in cands {
                for c in set.iter() {
                    random.insert(c.entity.clone(), rng.gen::<f64>());
                }
            }
        }

        // context similarity, with the singleton shortcut
        let local_sim: Vec<HashMap<Entity, f64>> = mentions
            .iter()
            .zip(cands)
            .map(|(m, set)| {
                if let Some(c) = set.sole() {
                    return HashMap::from([(c.entity.clone(), 1.0)]);
                }
                set.iter()
                    .map(|c| {
                        let sim = mention_entity_similarity(m, &c.entity, context);
                        (c.entity.clone(), sim)
                    })
                    .collect()
            })
            .collect();

        Self {
            random,
            mention_weights,
            local_sim,
        }
    }

    fn mention_weight(&self, idx: usize, strategy: PrefStrategy) -> f64 {
        match strategy {
            PrefStrategy::Tfidf => self.mention_weights[idx],
            _ => 1.0,
        }
    }

    fn entity_weight(
        &self,
        idx: usize,
        entity: &Entity,
        strategy: PrefStrategy,
        set: &CandidateSet,
    ) -> f64 {
        match strategy {
            PrefStrategy::PriorProb => set.prior_of(entity).unwrap_or(0.0),
            PrefStrategy::CtxSim => self.local_sim[idx].get(entity).copied().unwrap_or(0.0),
            PrefStrategy::Random => self.random.get(entity).copied().unwrap_or(0.0),
            _ => 1.0,
        }
    }

    fn local_similarity(&self, idx: usize, entity: &Entity) -> f64 {
        self.local_sim[idx].get(entity).copied().unwrap_or(0.0)
    }
}

// ============================================================================
// Per-document graph state
// ============================================================================

/// Everything derived from one document's candidate entities: the node set,
/// the dense id map, the subgraph ranker and the per-entity signatures.
/// Discarded when the document is done.
struct DocumentGraph {
    nodes: BTreeSet<String>,
    ids: NameIdMap,
    ranker: Option<Box<dyn PageRanker>>,
    signatures: Signatures,
}

/// Drop candidates that cannot be ranked: absent from the node set, never
/// assigned an id, or left without a signature by a failed rank task.
/// Singleton sets are exempt — they resolve without ranking.
fn cleanup_candidates(cands: &mut [CandidateSet], doc: &DocumentGraph) {
    for set in cands.iter_mut() {
        if set.len() <= 1 {
            continue;
        }
        set.retain(|c| {
            doc.nodes.contains(&c.entity.name)
                && doc
                    .ids
                    .get(&c.entity.name)
                    .is_some_and(|id| doc.signatures.contains_key(id))
        });
    }
}

// ============================================================================
// EntityLinker
// ============================================================================

/// The linking entry point. Holds only borrowed collaborators — construct
/// one per deployment and reuse it across documents.
pub struct EntityLinker<'a, G: GraphStore> {
    graph: &'a G,
    config: &'a LinkerConfig,
    candidates: &'a dyn CandidateSelection,
    context: &'a dyn ContextCache,
    ranker: Option<&'a dyn CandidateRanker>,
    nil: Option<&'a dyn NilClassifier>,
}

impl<'a, G: GraphStore> EntityLinker<'a, G> {
    pub fn new(
        graph: &'a G,
        config: &'a LinkerConfig,
        candidates: &'a dyn CandidateSelection,
        context: &'a dyn ContextCache,
    ) -> Self {
        Self {
            graph,
            config,
            candidates,
            context,
            ranker: None,
            nil: None,
        }
    }

    /// Install a supervised ranking model (used when `config.supervised`).
    pub fn with_ranker(mut self, ranker: &'a dyn CandidateRanker) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Install a NIL classifier (used when `config.nil_prediction`).
    pub fn with_nil_classifier(mut self, nil: &'a dyn NilClassifier) -> Self {
        self.nil = Some(nil);
        self
    }

    /// Resolve every mention of a document. Returns, in input order, the
    /// linked entity name or `None` (NIL) per mention.
    pub fn link(&self, mentions: &[Mention]) -> Vec<Option<String>> {
        if mentions.is_empty() {
            return Vec::new();
        }

        let mut cands: Vec<CandidateSet> = self
            .candidates
            .select_mentions(mentions)
            .into_iter()
            .map(CandidateSet::from_priors)
            .collect();

        if cands.iter().all(CandidateSet::is_empty) {
            info!(mentions = mentions.len(), "no candidates for any mention");
            return vec![None; mentions.len()];
        }

        let cache = WeightCache::prepare(self.config, mentions, &cands, self.context);

        if self.config.use_iterative {
            self.link_iterative(mentions, &mut cands, &cache)
        } else {
            self.link_oneshot(mentions, &mut cands, &cache)
        }
    }

    // ========================================================================
    // Orchestration modes
    // ========================================================================

    fn link_iterative(
        &self,
        mentions: &[Mention],
        cands: &mut [CandidateSet],
        cache: &WeightCache,
    ) -> Vec<Option<String>> {
        let mut believed = if self.config.use_unambig_entity {
            self.unambiguous_entities(mentions, cands, cache)
        } else {
            BelievedEntities::new()
        };

        let mut doc = self.build_document_graph(cands);
        if doc.nodes.is_empty() {
            info!("no candidate entity is present in the graph");
            return vec![None; mentions.len()];
        }
        cleanup_candidates(cands, &doc);

        // least ambiguous first; stable sort keeps document order on ties
        let mut order: Vec<usize> = (0..mentions.len()).collect();
        order.sort_by_key(|&i| cands[i].len());

        for &i in &order {
            if let Some(c) = cands[i].sole() {
                let weight = cache.mention_weight(i, self.config.mention_pref);
                debug!(mention = %mentions[i].name, entity = %c.entity.name, "unambiguous");
                believed.insert(c.entity.name.clone(), weight);
            }
        }

        let comparator = self.comparator();
        for &i in &order {
            if cands[i].len() < 2 {
                continue;
            }

            // only before the first resolution, and only when the document
            // had no unambiguous mention at all
            let fallback;
            let current: &BelievedEntities = if believed.is_empty() {
                fallback = self.approximate_entities(mentions, cands, cache);
                &fallback
            } else {
                &believed
            };

            let avoid = self.avoid_set(&cands[i], current);
            let doc_sig = self.compute_doc_signature(current, &avoid, &mut doc);

            let chosen =
                self.disambiguate_mention(&mentions[i], i, cands, &doc_sig, &doc, cache, &comparator);
            if let Some(entity) = chosen {
                let weight = cache.mention_weight(i, self.config.mention_pref);
                believed.insert(entity.name, weight);
            }
        }

        (0..mentions.len())
            .map(|i| cands[i].first().map(|c| c.entity.name.clone()))
            .collect()
    }

    fn link_oneshot(
        &self,
        mentions: &[Mention],
        cands: &mut [CandidateSet],
        cache: &WeightCache,
    ) -> Vec<Option<String>> {
        let mut believed = if self.config.use_unambig_entity {
            self.unambiguous_entities(mentions, cands, cache)
        } else {
            BelievedEntities::new()
        };

        let mut doc = self.build_document_graph(cands);
        cleanup_candidates(cands, &doc);

        for (i, set) in cands.iter().enumerate() {
            if let Some(c) = set.sole() {
                let weight = cache.mention_weight(i, self.config.mention_pref);
                believed.insert(c.entity.name.clone(), weight);
            }
        }

        // fixed for the whole document, unlike the iterative path
        if believed.is_empty() {
            believed = self.approximate_entities(mentions, cands, cache);
        }

        let comparator = self.comparator();
        let mut resolved = Vec::with_capacity(mentions.len());
        for i in 0..mentions.len() {
            if cands[i].is_empty() {
                resolved.push(None);
                continue;
            }
            if let Some(c) = cands[i].sole() {
                resolved.push(Some(c.entity.name.clone()));
                continue;
            }

            let avoid = self.avoid_set(&cands[i], &believed);
            let doc_sig = self.compute_doc_signature(&believed, &avoid, &mut doc);
            let chosen =
                self.disambiguate_mention(&mentions[i], i, cands, &doc_sig, &doc, cache, &comparator);
            resolved.push(chosen.map(|e| e.name));
        }

        resolved
    }

    // ========================================================================
    // Pipeline stages
    // ========================================================================

    /// Entities of effectively unambiguous mentions with their weights.
    ///
    /// A mention with several candidates also counts when the max-prior and
    /// max-context-similarity candidates agree; that agreement prunes the
    /// losing candidates as a side effect.
    fn unambiguous_entities(
        &self,
        mentions: &[Mention],
        cands: &mut [CandidateSet],
        cache: &WeightCache,
    ) -> BelievedEntities {
        let mut believed = BelievedEntities::new();

        for i in 0..mentions.len() {
            if cands[i].is_empty() {
                continue;
            }
            let weight = cache.mention_weight(i, self.config.mention_pref);

            if let Some(c) = cands[i].sole() {
                believed.insert(c.entity.name.clone(), weight);
                continue;
            }

            let mut max_prior = 0.0;
            let mut max_sim = 0.0;
            let mut prior_entity: Option<Entity> = None;
            let mut sim_entity: Option<Entity> = None;
            for c in cands[i].iter() {
                let sim = cache.local_similarity(i, &c.entity);
                if c.prior > max_prior {
                    max_prior = c.prior;
                    prior_entity = Some(c.entity.clone());
                }
                if sim > max_sim {
                    max_sim = sim;
                    sim_entity = Some(c.entity.clone());
                }
            }

            if let (Some(by_prior), Some(by_sim)) = (prior_entity, sim_entity) {
                if by_prior == by_sim {
                    debug!(mention = %mentions[i].name, entity = %by_prior.name,
                        "prior and context agree; treating as unambiguous");
                    believed.insert(by_prior.name.clone(), weight);
                    cands[i].keep_only(&by_prior);
                }
            }
        }

        believed
    }

    /// Fallback document distribution when nothing is believed yet: each
    /// mention's candidates weighted by the configured entity-preference
    /// strategy, normalized per mention, scaled by mention importance.
    fn approximate_entities(
        &self,
        mentions: &[Mention],
        cands: &[CandidateSet],
        cache: &WeightCache,
    ) -> BelievedEntities {
        let mut believed = BelievedEntities::new();

        for i in 0..mentions.len() {
            let set = &cands[i];
            if set.is_empty() {
                continue;
            }
            let mention_weight = cache.mention_weight(i, self.config.mention_pref);

            if let Some(c) = set.sole() {
                believed.insert(c.entity.name.clone(), mention_weight);
                continue;
            }

            let mut weights: Vec<(Entity, f64)> = set
                .iter()
                .map(|c| {
                    let w = cache.entity_weight(i, &c.entity, self.config.entity_pref, set);
                    (c.entity.clone(), w)
                })
                .collect();

            let total: f64 = weights.iter().map(|(_, w)| w).sum();
            if total > 0.0 {
                for (_, w) in &mut weights {
                    *w /= total;
                }
            }

            for (entity, w) in weights {
                if self.config.randomized() {
                    let w = cache.entity_weight(i, &entity, PrefStrategy::Random, set);
                    believed.insert(entity.name, w);
                } else {
                    believed.insert(entity.name, w * mention_weight);
                }
            }
        }

        believed
    }

    /// Candidate entity names present in the graph store. Entities the graph
    /// does not know cannot be ranked and are cleaned up later.
    fn collect_nodes(&self, cands: &[CandidateSet]) -> BTreeSet<String> {
        cands
            .iter()
            .flat_map(CandidateSet::iter)
            .filter(|c| self.graph.contains_node(&c.entity.name))
            .map(|c| c.entity.name.clone())
            .collect()
    }

    /// Expand the candidate node set into a subgraph, build the configured
    /// ranking engine over it, and compute one signature per candidate id.
    fn build_document_graph(&self, cands: &[CandidateSet]) -> DocumentGraph {
        let nodes = self.collect_nodes(cands);
        let mut ids = NameIdMap::new();
        let level = self.config.expansion_level;
        let mut generator = SubgraphGenerator::new(self.graph, self.config);

        let ranker: Option<Box<dyn PageRanker>> = if nodes.is_empty() {
            None
        } else if self.config.weighted {
            let edges = if self.graph.is_directed() {
                generator
                    .expanded_weighted_directed(&nodes, &mut ids, level)
                    .unwrap_or_default()
            } else {
                generator.expanded_weighted_undirected(&nodes, &mut ids, level)
            };
            (!edges.is_empty()).then(|| {
                Box::new(WeightedPageRank::new(ids.len(), &edges, self.config))
                    as Box<dyn PageRanker>
            })
        } else {
            let adjacency = if self.graph.is_directed() {
                generator
                    .expanded_unweighted_directed(&nodes, &mut ids, level)
                    .unwrap_or_default()
            } else {
                generator.expanded_unweighted_undirected(&nodes, &mut ids, level)
            };
            (!adjacency.is_empty()).then(|| {
                Box::new(UnweightedPageRank::new(&adjacency, self.config)) as Box<dyn PageRanker>
            })
        };

        let id_set: BTreeSet<u32> = nodes.iter().filter_map(|n| ids.get(n).copied()).collect();
        let signatures = match &ranker {
            Some(ranker) if !id_set.is_empty() => ranker.compute_rank_parallel(&id_set),
            _ => Signatures::new(),
        };

        info!(
            candidates = nodes.len(),
            subgraph_nodes = ids.len(),
            signatures = signatures.len(),
            "document graph ready"
        );

        DocumentGraph {
            nodes,
            ids,
            ranker,
            signatures,
        }
    }

    /// A mention's own candidates that already sit in the believed-entity
    /// set. Restarting from them would inflate their own similarity scores.
    fn avoid_set(&self, set: &CandidateSet, believed: &BelievedEntities) -> BTreeSet<String> {
        set.iter()
            .filter(|c| believed.contains_key(&c.entity.name))
            .map(|c| {
                debug!(entity = %c.entity.name, "candidate already believed; excluded from restart");
                c.entity.name.clone()
            })
            .collect()
    }

    /// Personalized PageRank restarting from the believed-entity
    /// distribution, minus the avoid set. Empty on any degenerate condition;
    /// the feature extractor treats an empty signature as zero divergence
    /// everywhere.
    fn compute_doc_signature(
        &self,
        believed: &BelievedEntities,
        avoid: &BTreeSet<String>,
        doc: &mut DocumentGraph,
    ) -> Vec<f64> {
        let n = doc.ids.len();
        let Some(ranker) = doc.ranker.as_deref_mut() else {
            return Vec::new();
        };
        if n == 0 {
            return Vec::new();
        }

        let mut preference = vec![0.0; n];
        for (name, &weight) in believed {
            if avoid.contains(name) {
                continue;
            }
            if let Some(&id) = doc.ids.get(name) {
                preference[id as usize] = weight;
            }
        }

        normalize(&mut preference);
        if !is_stochastic(&preference) {
            preference.fill(1.0 / n as f64);
        }

        ranker.set_preference(preference);
        let Some(rank) = ranker.compute_rank() else {
            return Vec::new();
        };
        if rank.len() != n {
            return Vec::new();
        }
        rank
    }

    /// Score every surviving candidate of one mention and commit the winner:
    /// losers leave the candidate set, a NIL outcome empties it.
    #[allow(clippy::too_many_arguments)]
    fn disambiguate_mention(
        &self,
        mention: &Mention,
        idx: usize,
        cands: &mut [CandidateSet],
        doc_sig: &[f64],
        doc: &DocumentGraph,
        cache: &WeightCache,
        comparator: &FeatureComparator,
    ) -> Option<Entity> {
        let set = &mut cands[idx];
        if set.is_empty() {
            return None;
        }
        if let Some(c) = set.sole() {
            return Some(c.entity.clone());
        }

        let surface = mention.name.to_lowercase();
        let mut entities: Vec<Entity> = Vec::with_capacity(set.len());
        let mut features: Vec<Feature> = Vec::with_capacity(set.len());
        for c in set.iter() {
            let Some(&id) = doc.ids.get(&c.entity.name) else {
                continue;
            };
            let Some(signature) = doc.signatures.get(&id) else {
                continue;
            };

            let divergence = zero_kl_divergence(signature, doc_sig);
            features.push(Feature {
                prior: c.prior,
                local: cache.local_similarity(idx, &c.entity),
                sem_sim: 1.0 / divergence.max(MIN_DIVERGENCE),
                name_sim: ngram_similarity(&surface, &c.entity.name.to_lowercase(), 2),
            });
            entities.push(c.entity.clone());
        }

        if entities.is_empty() {
            set.clear();
            return None;
        }

        let choice = if self.config.supervised {
            self.ranker.and_then(|r| r.predict(&features))
        } else {
            normalize_columns(&mut features);
            comparator.best(&features)
        };

        // NIL gate on the chosen candidate's features
        let choice = choice.filter(|&i| !self.predict_nil(&features[i]));

        match choice {
            Some(i) => {
                let chosen = entities[i].clone();
                debug!(mention = %mention.name, entity = %chosen.name, "resolved");
                set.keep_only(&chosen);
                Some(chosen)
            }
            None => {
                debug!(mention = %mention.name, "resolved to NIL");
                set.clear();
                None
            }
        }
    }

    fn predict_nil(&self, feature: &Feature) -> bool {
        if !self.config.nil_prediction {
            return false;
        }
        self.nil.is_some_and(|n| n.is_nil(feature))
    }

    fn comparator(&self) -> FeatureComparator {
        FeatureComparator::new(
            self.config.rank_scheme,
            FeatureWeights {
                prior: self.config.prior_weight,
                local: self.config.local_weight,
            },
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
