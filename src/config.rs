//! Linker configuration.
//!
//! One immutable [`LinkerConfig`] is constructed at startup (programmatically
//! or from a JSON file) and passed by reference into the orchestrator, the
//! subgraph generator and the PageRank engine. Nothing in the crate reads
//! configuration from global state.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Strategy enums
// ============================================================================

/// How restart-distribution weight is assigned to mentions and candidate
/// entities. `Tfidf` applies to mentions only; `PriorProb` and `CtxSim` to
/// entities only — the others fall back to a weight of 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefStrategy {
    Uniform,
    Random,
    Tfidf,
    PriorProb,
    CtxSim,
}

/// How per-candidate features combine into a ranking decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankScheme {
    /// Weighted linear combination of prior, local and semantic similarity.
    Linear,
    /// Weighted multiplicative combination.
    Multiply,
    /// 2-of-3 majority vote over the prior, local and semantic columns.
    Vote,
    /// prior × semantic.
    PriorSem,
    /// local × semantic.
    LocalSem,
    /// Noisy-OR of prior, local and semantic.
    NoisyOr,
    /// Pure semantic similarity.
    Semantic,
}

// ============================================================================
// LinkerConfig
// ============================================================================

/// Immutable knobs for one deployment of the linker.
///
/// The popularity thresholds and the iteration cap are empirically tuned
/// values; treat them as dials, not derived quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Hops of subgraph expansion around the candidate set.
    pub expansion_level: usize,
    /// PageRank damping factor.
    pub alpha: f64,
    /// Stop a solver once the L1 delta between sweeps falls below this.
    pub tolerance: f64,
    /// Hard cap on solver sweeps. Deliberately low: only the top-ranked
    /// mass matters for disambiguation, not exact convergence.
    pub max_iterations: usize,
    /// Select the weighted (power-method) or unweighted (Gauss–Seidel)
    /// ranking engine.
    pub weighted: bool,
    /// Resolve mentions one at a time, feeding each decision into the next
    /// document signature. When false, one shared signature is computed up
    /// front and never updated.
    pub use_iterative: bool,
    /// Seed the believed-entity set from unambiguous mentions (including the
    /// prior/context agreement tie-break).
    pub use_unambig_entity: bool,
    /// Importance weighting for mentions.
    pub mention_pref: PrefStrategy,
    /// Restart weighting for candidate entities.
    pub entity_pref: PrefStrategy,
    /// Feature combination used by the unsupervised ranker.
    pub rank_scheme: RankScheme,
    /// Weight on the prior probability in `Linear`/`Multiply` schemes.
    pub prior_weight: f64,
    /// Weight on local context similarity in the `Linear` scheme.
    pub local_weight: f64,
    /// Use the injected supervised ranker instead of the unsupervised scorer.
    pub supervised: bool,
    /// Gate every chosen candidate through the injected NIL classifier.
    pub nil_prediction: bool,
    /// Worker threads for the weighted signature batch.
    pub threads: usize,
    /// Minimum in-degree for a neighbor to be admitted during expansion of a
    /// directed link graph.
    pub directed_threshold: usize,
    /// Minimum in-degree for expansion of an undirected co-occurrence graph.
    /// Higher than the directed threshold: co-occurrence graphs are denser.
    pub undirected_threshold: usize,
    /// Seed for the `Random` preference strategy; `None` seeds from entropy.
    pub random_seed: Option<u64>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            expansion_level: 1,
            alpha: crate::rank::DEFAULT_ALPHA,
            tolerance: crate::rank::DEFAULT_TOLERANCE,
            max_iterations: crate::rank::DEFAULT_MAX_ITERATIONS,
            weighted: true,
            use_iterative: true,
            use_unambig_entity: true,
            mention_pref: PrefStrategy::Uniform,
            entity_pref: PrefStrategy::Uniform,
            rank_scheme: RankScheme::Linear,
            prior_weight: 0.2,
            local_weight: 0.1,
            supervised: false,
            nil_prediction: false,
            threads: 32,
            directed_threshold: 200,
            undirected_threshold: 600,
            random_seed: None,
        }
    }
}

impl LinkerConfig {
    /// Load a configuration from a JSON file. Missing fields take the
    /// defaults above.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("opening {}: {e}", path.display())))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        Ok(config.reconciled())
    }

    /// Selecting `Random` for either preference strategy selects it for both.
    pub fn reconciled(mut self) -> Self {
        if self.mention_pref == PrefStrategy::Random || self.entity_pref == PrefStrategy::Random {
            self.mention_pref = PrefStrategy::Random;
            self.entity_pref = PrefStrategy::Random;
        }
        self
    }

    /// True when any restart weighting is randomized.
    pub fn randomized(&self) -> bool {
        self.mention_pref == PrefStrategy::Random || self.entity_pref == PrefStrategy::Random
    }

    /// The expansion threshold that applies to the given graph variant.
    pub fn expansion_threshold(&self, directed: bool) -> usize {
        if directed {
            self.directed_threshold
        } else {
            self.undirected_threshold
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
