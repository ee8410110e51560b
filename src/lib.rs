//! # semsig — Graph-Based Entity Linking
//!
//! Disambiguates textual mentions against a knowledge base by ranking
//! candidate entities with *semantic signatures*: personalized PageRank
//! vectors computed over a Wikipedia-style link/co-occurrence graph,
//! combined with prior-probability, context-similarity and name-similarity
//! features.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore`, `CandidateSelection`, `ContextCache`
//!    are the contracts between the disambiguation engine and its collaborators
//! 2. **Clean DTOs**: `Entity`, `Mention`, `Feature` cross all boundaries
//! 3. **Immutable configuration**: one `LinkerConfig`, built once, passed by
//!    reference — no global state
//! 4. **Per-document lifecycle**: subgraphs, id maps and rank vectors are
//!    built fresh for each document and discarded; the underlying graph is
//!    loaded once and read-only thereafter
//!
//! ## Quick Start
//!
//! ```rust
//! use semsig::{
//!     Entity, EntityLinker, LinkGraph, LinkerConfig, Mention,
//!     StaticCandidates, StaticContext,
//! };
//!
//! // A tiny undirected co-occurrence graph.
//! let graph = LinkGraph::from_edges(
//!     [
//!         ("University of Alberta", "Edmonton", 12),
//!         ("Edmonton", "Alberta", 7),
//!     ],
//!     false,
//! );
//!
//! // Alias table with one unambiguous candidate.
//! let mut candidates = StaticCandidates::new();
//! candidates.insert("U of A", Entity::new("University of Alberta"), 1.0);
//!
//! let config = LinkerConfig::default();
//! let context = StaticContext::new();
//! let linker = EntityLinker::new(&graph, &config, &candidates, &context);
//!
//! let mentions = vec![Mention::new(Entity::new("U of A"), 0, 3)];
//! let resolved = linker.link(&mentions);
//! assert_eq!(resolved, vec![Some("University of Alberta".to_string())]);
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | Graph store | `graph` | Immutable weighted graph, name-keyed queries |
//! | Subgraph | `graph::subgraph` | Bounded neighborhood expansion, dense ids |
//! | Ranking | `rank` | Personalized PageRank, weighted + unweighted |
//! | Features | `features` | Per-candidate feature vectors and rank schemes |
//! | Orchestration | `linker` | Iterative mention-by-mention disambiguation |

// ============================================================================
// Modules
// ============================================================================

pub mod candidate;
pub mod config;
pub mod features;
pub mod graph;
pub mod linker;
pub mod model;
pub mod predict;
pub mod rank;
pub mod similarity;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Entity, EntityKind, Mention};

// ============================================================================
// Re-exports: Graph
// ============================================================================

pub use graph::subgraph::{Edge, NameIdMap, SubgraphGenerator};
pub use graph::{GraphStore, LinkGraph};

// ============================================================================
// Re-exports: Ranking
// ============================================================================

pub use rank::{PageRanker, UnweightedPageRank, WeightedPageRank};

// ============================================================================
// Re-exports: Collaborator contracts
// ============================================================================

pub use candidate::{CandidateSelection, StaticCandidates};
pub use predict::{CandidateRanker, NilClassifier};
pub use similarity::context::{ContextCache, ContextVector, StaticContext};

// ============================================================================
// Re-exports: Configuration and orchestration
// ============================================================================

pub use config::{LinkerConfig, PrefStrategy, RankScheme};
pub use features::Feature;
pub use linker::EntityLinker;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A persisted graph snapshot is missing or malformed. Fatal at startup:
    /// the graph is required for every document.
    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
