//! # Graph Store
//!
//! The immutable, weighted entity graph the disambiguation engine walks.
//! `GraphStore` is THE contract between the engine and any graph
//! representation; `LinkGraph` is the in-memory CSR implementation with two
//! variants:
//!
//! | Variant | Adjacency | Typical source |
//! |------------|--------------------------|--------------------------|
//! | directed | forward + backward CSR | Wikipedia page-link graph |
//! | undirected | single CSR, in == out | co-occurrence graph |
//!
//! All queries are keyed by entity name. Unknown names answer with degree 0
//! or `None` — never an error. The store is loaded once at startup and is
//! read-only thereafter; a failed load aborts initialization.

pub mod subgraph;

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

// ============================================================================
// GraphStore trait
// ============================================================================

/// Read-only query surface over an entity graph.
pub trait GraphStore {
    /// Whether the graph distinguishes edge direction.
    fn is_directed(&self) -> bool;

    fn num_nodes(&self) -> usize;

    fn num_arcs(&self) -> usize;

    fn contains_node(&self, name: &str) -> bool;

    /// Out-degree of the named node; 0 when the name is unknown.
    fn out_degree(&self, name: &str) -> usize;

    /// In-degree of the named node; 0 when the name is unknown.
    /// Equals `out_degree` on undirected graphs.
    fn in_degree(&self, name: &str) -> usize;

    /// Raw successor ids of the named node.
    fn out_links(&self, name: &str) -> Option<&[u32]>;

    /// Raw predecessor ids of the named node.
    fn in_links(&self, name: &str) -> Option<&[u32]>;

    /// Successors with their edge weights, keyed by neighbor name.
    fn out_links2(&self, name: &str) -> Option<BTreeMap<String, u32>>;

    /// Predecessors with their edge weights, keyed by neighbor name.
    fn in_links2(&self, name: &str) -> Option<BTreeMap<String, u32>>;
}

// ============================================================================
// CSR adjacency
// ============================================================================

/// Compressed sparse rows: the successor lists of all nodes, flattened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Csr {
    offsets: Vec<usize>,
    targets: Vec<u32>,
    weights: Vec<u32>,
}

impl Csr {
    fn from_arcs(num_nodes: usize, arcs: &[(u32, u32, u32)]) -> Self {
        let mut degree = vec![0usize; num_nodes];
        for &(s, _, _) in arcs {
            degree[s as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(num_nodes + 1);
        let mut acc = 0usize;
        offsets.push(0);
        for d in &degree {
            acc += d;
            offsets.push(acc);
        }

        let mut cursor: Vec<usize> = offsets[..num_nodes].to_vec();
        let mut targets = vec![0u32; arcs.len()];
        let mut weights = vec![0u32; arcs.len()];
        for &(s, t, w) in arcs {
            let at = cursor[s as usize];
            targets[at] = t;
            weights[at] = w;
            cursor[s as usize] += 1;
        }

        Self {
            offsets,
            targets,
            weights,
        }
    }

    fn degree(&self, id: usize) -> usize {
        self.offsets[id + 1] - self.offsets[id]
    }

    fn successors(&self, id: usize) -> &[u32] {
        &self.targets[self.offsets[id]..self.offsets[id + 1]]
    }

    fn labelled(&self, id: usize) -> impl Iterator<Item = (u32, u32)> + '_ {
        let range = self.offsets[id]..self.offsets[id + 1];
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }
}

// ============================================================================
// LinkGraph
// ============================================================================

/// In-memory entity graph with name↔id maps.
///
/// Directed graphs keep a second, reversed CSR so in-link queries are as
/// cheap as out-link queries. Undirected graphs answer both from the one
/// mirrored CSR.
#[derive(Debug, Clone)]
pub struct LinkGraph {
    directed: bool,
    name2id: HashMap<String, u32>,
    id2name: Vec<String>,
    forward: Csr,
    backward: Option<Csr>,
}

/// On-disk form: the forward arc list plus the id→name table.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    directed: bool,
    names: Vec<String>,
    arcs: Vec<(u32, u32, u32)>,
}

impl LinkGraph {
    /// Build a graph from (source, target, weight) edges. Node ids are
    /// assigned densely in first-seen order. Undirected edges are mirrored.
    pub fn from_edges<S: AsRef<str>>(
        edges: impl IntoIterator<Item = (S, S, u32)>,
        directed: bool,
    ) -> Self {
        let mut name2id: HashMap<String, u32> = HashMap::new();
        let mut id2name: Vec<String> = Vec::new();
        let mut arcs: Vec<(u32, u32, u32)> = Vec::new();

        let intern = |name: &str, name2id: &mut HashMap<String, u32>, id2name: &mut Vec<String>| {
            if let Some(&id) = name2id.get(name) {
                return id;
            }
            let id = id2name.len() as u32;
            name2id.insert(name.to_string(), id);
            id2name.push(name.to_string());
            id
        };

        for (s, t, w) in edges {
            let sid = intern(s.as_ref(), &mut name2id, &mut id2name);
            let tid = intern(t.as_ref(), &mut name2id, &mut id2name);
            arcs.push((sid, tid, w));
            if !directed {
                arcs.push((tid, sid, w));
            }
        }

        Self::from_arcs(directed, name2id, id2name, arcs)
    }

    fn from_arcs(
        directed: bool,
        name2id: HashMap<String, u32>,
        id2name: Vec<String>,
        arcs: Vec<(u32, u32, u32)>,
    ) -> Self {
        let n = id2name.len();
        let forward = Csr::from_arcs(n, &arcs);
        let backward = directed.then(|| {
            let reversed: Vec<(u32, u32, u32)> =
                arcs.iter().map(|&(s, t, w)| (t, s, w)).collect();
            Csr::from_arcs(n, &reversed)
        });

        Self {
            directed,
            name2id,
            id2name,
            forward,
            backward,
        }
    }

    /// Read a `source \t target \t weight` edge list, such as the output of
    /// a Wikipedia link extraction.
    pub fn import_tsv(path: impl AsRef<Path>, directed: bool) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut edges: Vec<(String, String, u32)> = Vec::new();

        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut cols = line.split('\t');
            let (Some(s), Some(t), Some(w)) = (cols.next(), cols.next(), cols.next()) else {
                return Err(Error::Store(format!(
                    "line {}: expected 'source<TAB>target<TAB>weight'",
                    lineno + 1
                )));
            };
            let w: u32 = w.parse().map_err(|e| {
                Error::Store(format!("line {}: bad weight '{w}': {e}", lineno + 1))
            })?;
            edges.push((s.to_string(), t.to_string(), w));
        }

        info!(edges = edges.len(), directed, "imported edge list");
        Ok(Self::from_edges(edges, directed))
    }

    /// Persist the graph as a JSON snapshot at `<prefix>.graph.json`.
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<()> {
        let path = Self::snapshot_path(prefix.as_ref());
        let snapshot = Snapshot {
            directed: self.directed,
            names: self.id2name.clone(),
            arcs: self.forward_arcs(),
        };
        let file = File::create(&path)?;
        serde_json::to_writer(BufWriter::new(file), &snapshot)
            .map_err(|e| Error::Store(format!("writing {}: {e}", path.display())))?;
        info!(path = %path.display(), nodes = self.num_nodes(), "graph stored");
        Ok(())
    }

    /// Load a snapshot previously written by [`save`](Self::save).
    ///
    /// Any failure here is fatal: the engine cannot run without its graph.
    pub fn load(prefix: impl AsRef<Path>) -> Result<Self> {
        let path = Self::snapshot_path(prefix.as_ref());
        let file = File::open(&path)
            .map_err(|e| Error::Store(format!("opening {}: {e}", path.display())))?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Store(format!("reading {}: {e}", path.display())))?;

        let n = snapshot.names.len();
        for &(s, t, _) in &snapshot.arcs {
            if s as usize >= n || t as usize >= n {
                return Err(Error::Store(format!(
                    "{}: arc ({s}, {t}) out of range for {n} nodes",
                    path.display()
                )));
            }
        }

        let name2id = snapshot
            .names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as u32))
            .collect();

        let graph = Self::from_arcs(snapshot.directed, name2id, snapshot.names, snapshot.arcs);
        info!(
            nodes = graph.num_nodes(),
            arcs = graph.num_arcs(),
            directed = graph.directed,
            "graph loaded"
        );
        Ok(graph)
    }

    fn snapshot_path(prefix: &Path) -> std::path::PathBuf {
        let mut os = prefix.as_os_str().to_owned();
        os.push(".graph.json");
        os.into()
    }

    /// The forward arc list, in CSR order. Snapshot arcs are stored exactly
    /// as built, so undirected graphs round-trip without re-mirroring.
    fn forward_arcs(&self) -> Vec<(u32, u32, u32)> {
        let mut arcs = Vec::with_capacity(self.forward.targets.len());
        for id in 0..self.num_nodes() {
            for (t, w) in self.forward.labelled(id) {
                arcs.push((id as u32, t, w));
            }
        }
        arcs
    }

    pub fn node_name(&self, id: u32) -> Option<&str> {
        self.id2name.get(id as usize).map(String::as_str)
    }

    pub fn node_id(&self, name: &str) -> Option<u32> {
        self.name2id.get(name).copied()
    }

    fn in_csr(&self) -> &Csr {
        self.backward.as_ref().unwrap_or(&self.forward)
    }

    fn links2_of(&self, csr: &Csr, name: &str) -> Option<BTreeMap<String, u32>> {
        let &id = self.name2id.get(name)?;
        let mut map = BTreeMap::new();
        for (t, w) in csr.labelled(id as usize) {
            map.insert(self.id2name[t as usize].clone(), w);
        }
        Some(map)
    }
}

impl GraphStore for LinkGraph {
    fn is_directed(&self) -> bool {
        self.directed
    }

    fn num_nodes(&self) -> usize {
        self.id2name.len()
    }

    fn num_arcs(&self) -> usize {
        self.forward.targets.len()
    }

    fn contains_node(&self, name: &str) -> bool {
        self.name2id.contains_key(name)
    }

    fn out_degree(&self, name: &str) -> usize {
        self.name2id
            .get(name)
            .map_or(0, |&id| self.forward.degree(id as usize))
    }

    fn in_degree(&self, name: &str) -> usize {
        self.name2id
            .get(name)
            .map_or(0, |&id| self.in_csr().degree(id as usize))
    }

    fn out_links(&self, name: &str) -> Option<&[u32]> {
        let &id = self.name2id.get(name)?;
        Some(self.forward.successors(id as usize))
    }

    fn in_links(&self, name: &str) -> Option<&[u32]> {
        let &id = self.name2id.get(name)?;
        Some(self.in_csr().successors(id as usize))
    }

    fn out_links2(&self, name: &str) -> Option<BTreeMap<String, u32>> {
        self.links2_of(&self.forward, name)
    }

    fn in_links2(&self, name: &str) -> Option<BTreeMap<String, u32>> {
        self.links2_of(self.in_csr(), name)
    }
}

// ============================================================================
// Tests
// ============================================================================
