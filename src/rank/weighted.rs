//! Power-method personalized PageRank over a weighted subgraph.
//!
//! The batch mode fans one-hot restarts out across a fixed pool of scoped
//! worker threads. Workers share the immutable graph and pull tasks from an
//! atomic cursor; each owns its solver buffers, so no solver state crosses
//! threads. The call joins every worker before returning — no partial
//! results are ever visible, and a task that dies simply contributes no
//! signature.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::{l1_delta, uniform, PageRanker};
use crate::config::LinkerConfig;
use crate::graph::subgraph::Edge;

// ============================================================================
// Weighted CSR
// ============================================================================

/// Row-normalizable weighted adjacency in CSR form.
struct WeightedCsr {
    num_nodes: usize,
    offsets: Vec<usize>,
    targets: Vec<u32>,
    weights: Vec<f64>,
    /// Total outgoing weight per node; 0.0 marks a dangling node.
    out_sums: Vec<f64>,
}

impl WeightedCsr {
    fn build(num_nodes: usize, edges: &[Edge]) -> Self {
        let mut degree = vec![0usize; num_nodes];
        for e in edges {
            if e.weight == 0.0 {
                continue;
            }
            degree[e.source as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(num_nodes + 1);
        let mut acc = 0;
        offsets.push(0);
        for d in &degree {
            acc += d;
            offsets.push(acc);
        }

        let mut cursor: Vec<usize> = offsets[..num_nodes].to_vec();
        let mut targets = vec![0u32; acc];
        let mut weights = vec![0f64; acc];
        let mut out_sums = vec![0f64; num_nodes];
        for e in edges {
            if e.weight == 0.0 {
                continue;
            }
            let s = e.source as usize;
            targets[cursor[s]] = e.target;
            weights[cursor[s]] = e.weight;
            cursor[s] += 1;
            out_sums[s] += e.weight;
        }

        Self {
            num_nodes,
            offsets,
            targets,
            weights,
            out_sums,
        }
    }
}

/// One power-method solve: strongly preferential, dual stopping criteria.
fn power_method(
    csr: &WeightedCsr,
    preference: &[f64],
    start: Option<&[f64]>,
    alpha: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Vec<f64> {
    let n = csr.num_nodes;
    let mut rank = start.map_or_else(|| preference.to_vec(), <[f64]>::to_vec);

    for sweep in 0..max_iterations {
        let mut next = vec![0.0; n];
        let mut dangling = 0.0;

        for u in 0..n {
            let total = csr.out_sums[u];
            if total == 0.0 {
                dangling += rank[u];
                continue;
            }
            let outgoing = alpha * rank[u] / total;
            for i in csr.offsets[u]..csr.offsets[u + 1] {
                next[csr.targets[i] as usize] += outgoing * csr.weights[i];
            }
        }

        // teleport + dangling mass both restart into the preference vector
        let restart = 1.0 - alpha + alpha * dangling;
        for (x, p) in next.iter_mut().zip(preference) {
            *x += restart * p;
        }

        let delta = l1_delta(&rank, &next);
        rank = next;
        if delta < tolerance {
            debug!(sweep, delta, "power method converged");
            break;
        }
    }

    rank
}

// ============================================================================
// WeightedPageRank
// ============================================================================

/// The weighted ranking engine. Built once per document from the extracted
/// subgraph; read-only afterwards except for the preference/start vectors.
pub struct WeightedPageRank {
    csr: WeightedCsr,
    alpha: f64,
    tolerance: f64,
    max_iterations: usize,
    threads: usize,
    preference: Option<Vec<f64>>,
    start: Option<Vec<f64>>,
}

impl WeightedPageRank {
    pub fn new(num_nodes: usize, edges: &[Edge], config: &LinkerConfig) -> Self {
        Self {
            csr: WeightedCsr::build(num_nodes, edges),
            alpha: config.alpha,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            threads: config.threads.max(1),
            preference: None,
            start: None,
        }
    }

    fn solve(&self, preference: &[f64], start: Option<&[f64]>) -> Vec<f64> {
        power_method(
            &self.csr,
            preference,
            start,
            self.alpha,
            self.tolerance,
            self.max_iterations,
        )
    }
}

impl PageRanker for WeightedPageRank {
    fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    fn set_preference(&mut self, preference: Vec<f64>) {
        self.preference = Some(preference);
    }

    fn set_start(&mut self, start: Vec<f64>) {
        self.start = Some(start);
    }

    fn compute_rank(&mut self) -> Option<Vec<f64>> {
        let n = self.csr.num_nodes;
        if n == 0 {
            return None;
        }
        let preference = match &self.preference {
            Some(p) if p.len() == n => p.clone(),
            _ => uniform(n),
        };
        Some(self.solve(&preference, self.start.as_deref()))
    }

    fn compute_rank_parallel(&self, ids: &BTreeSet<u32>) -> HashMap<u32, Vec<f64>> {
        let n = self.csr.num_nodes;
        if n == 0 || ids.is_empty() {
            return HashMap::new();
        }

        let tasks: Vec<u32> = ids.iter().copied().filter(|&id| (id as usize) < n).collect();
        let workers = self.threads.min(tasks.len()).max(1);
        let cursor = AtomicUsize::new(0);

        let mut results = HashMap::with_capacity(tasks.len());
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut local: Vec<(u32, Vec<f64>)> = Vec::new();
                        let mut preference = vec![0.0; n];
                        loop {
                            let next = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(&id) = tasks.get(next) else { break };

                            preference.fill(0.0);
                            preference[id as usize] = 1.0;
                            local.push((id, self.solve(&preference, None)));
                        }
                        local
                    })
                })
                .collect();

            for handle in handles {
                // a worker that died contributes no signatures; the candidate
                // cleanup pass drops the affected entities later
                if let Ok(local) = handle.join() {
                    for (id, rank) in local {
                        results.insert(id, rank);
                    }
                }
            }
        });

        debug!(
            tasks = tasks.len(),
            workers,
            computed = results.len(),
            "signature batch complete"
        );
        results
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(s: u32, t: u32, w: f64) -> Edge {
        Edge { source: s, target: t, weight: w }
    }

    fn config() -> LinkerConfig {
        LinkerConfig {
            max_iterations: 50,
            tolerance: 1e-12,
            threads: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_symmetric_cycle_ranks_equally() {
        let edges = [edge(0, 1, 1.0), edge(1, 2, 1.0), edge(2, 0, 1.0)];
        let mut ranker = WeightedPageRank::new(3, &edges, &config());
        let rank = ranker.compute_rank().unwrap();

        assert!((rank[0] - rank[1]).abs() < 1e-9);
        assert!((rank[1] - rank[2]).abs() < 1e-9);
        let total: f64 = rank.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dangling_mass_returns_to_preference() {
        // 0 -> 1, 0 -> 2; 1 and 2 are dangling.
        let edges = [edge(0, 1, 1.0), edge(0, 2, 1.0)];
        let mut ranker = WeightedPageRank::new(3, &edges, &config());
        ranker.set_preference(vec![1.0, 0.0, 0.0]);
        let rank = ranker.compute_rank().unwrap();

        let total: f64 = rank.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // all restart mass funnels through node 0
        assert!(rank[0] > rank[1]);
        assert!((rank[1] - rank[2]).abs() < 1e-12);
    }

    #[test]
    fn test_one_hot_restart_favors_restart_neighborhood() {
        let edges = [
            edge(0, 1, 10.0),
            edge(1, 0, 10.0),
            edge(2, 3, 10.0),
            edge(3, 2, 10.0),
        ];
        let mut ranker = WeightedPageRank::new(4, &edges, &config());
        ranker.set_preference(vec![1.0, 0.0, 0.0, 0.0]);
        let rank = ranker.compute_rank().unwrap();

        assert!(rank[0] > rank[2]);
        assert!(rank[1] > rank[3]);
    }

    #[test]
    fn test_heavier_edges_attract_more_mass() {
        // 0 splits mass 9:1 between 1 and 2.
        let edges = [edge(0, 1, 9.0), edge(0, 2, 1.0)];
        let mut ranker = WeightedPageRank::new(3, &edges, &config());
        ranker.set_preference(vec![1.0, 0.0, 0.0]);
        let rank = ranker.compute_rank().unwrap();
        assert!(rank[1] > rank[2]);
    }

    #[test]
    fn test_empty_graph_has_no_rank() {
        let mut ranker = WeightedPageRank::new(0, &[], &config());
        assert!(ranker.compute_rank().is_none());
        assert!(ranker.compute_rank_parallel(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_parallel_batch_matches_sequential() {
        let edges = [
            edge(0, 1, 2.0),
            edge(1, 2, 3.0),
            edge(2, 0, 1.0),
            edge(2, 3, 4.0),
            edge(3, 1, 1.0),
        ];
        let cfg = config();
        let ids: BTreeSet<u32> = [0, 1, 2, 3].into_iter().collect();

        let ranker = WeightedPageRank::new(4, &edges, &cfg);
        let batch = ranker.compute_rank_parallel(&ids);
        assert_eq!(batch.len(), 4);

        for &id in &ids {
            let mut single = WeightedPageRank::new(4, &edges, &cfg);
            let mut preference = vec![0.0; 4];
            preference[id as usize] = 1.0;
            single.set_preference(preference);
            let expected = single.compute_rank().unwrap();
            assert_eq!(batch[&id], expected);
        }
    }

    #[test]
    fn test_out_of_range_ids_are_skipped() {
        let edges = [edge(0, 1, 1.0)];
        let ranker = WeightedPageRank::new(2, &edges, &config());
        let ids: BTreeSet<u32> = [0, 7].into_iter().collect();
        let batch = ranker.compute_rank_parallel(&ids);
        assert!(batch.contains_key(&0));
        assert!(!batch.contains_key(&7));
    }
}
