//! Walktrap community detection.
//!
//! Agglomerative clustering on random-walk distances.
//!
//! ## The Algorithm (Pons & Latapy 2005)
//!
//! A random walk of length `t` started from node `i` ends at node `k` with
//! probability `P^t_ik`. Nodes in the same community see similar end-point
//! distributions. For two communities the distance is
//!
//! ```text
//! r²(C1, C2) = Σ_k (P^t_C1,k - P^t_C2,k)² / d(k)
//! ```
//!
//! where `P^t_C` is the size-weighted mean of its members' vectors. Starting
//! from singletons, the pair of *adjacent* communities with the smallest
//!
//! ```text
//! Δσ(C1, C2) = (1/n) · |C1||C2| / (|C1| + |C2|) · r²(C1, C2)
//! ```
//!
//! is merged, until no adjacent pair is left. The level of the resulting
//! dendrogram with the highest modularity is the returned partition.
//!
//! Every vertex gets a unit self-loop for the walk; modularity is measured on
//! the graph as given. Ties in Δσ go to the lowest community ids, and ties in
//! modularity to the earliest level, so the output is a pure function of the
//! graph.
//!
//! ## References
//!
//! Pons, Latapy (2005). "Computing communities in large networks using
//! random walks." ISCIS 2005, LNCS 3733.

use super::traits::{neighbor_lists, CommunityDetection};
use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use petgraph::graph::UnGraph;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Walktrap community detection.
#[derive(Debug, Clone)]
pub struct Walktrap {
    /// Random walk length.
    steps: usize,
}

impl Walktrap {
    /// Create a detector with walk length 4.
    pub fn new() -> Self {
        Self { steps: 4 }
    }

    /// Set random walk length.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Run the agglomeration.
    ///
    /// Returns the dendrogram and the modularity after each number of merges
    /// (`trace[0]` is the singleton partition). The trace is empty for graphs
    /// without edges.
    pub fn hierarchy<N, E>(&self, graph: &UnGraph<N, E>) -> Result<(Dendrogram, Vec<f64>)> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::EmptyInput("walktrap on a graph without nodes"));
        }
        if self.steps == 0 {
            return Err(Error::InvalidParameter {
                name: "steps",
                message: "walk length must be at least 1".to_string(),
            });
        }

        let adj = neighbor_lists(graph);
        let mut dendrogram = Dendrogram::new(n);
        let edges: usize = adj.iter().map(Vec::len).sum::<usize>() / 2;
        if edges == 0 {
            return Ok((dendrogram, Vec::new()));
        }

        let m = edges as f64;
        // walk degree includes the self-loop
        let walk_degree: Vec<f64> = adj.iter().map(|a| a.len() as f64 + 1.0).collect();

        let mut communities: Vec<Option<Community>> = (0..n)
            .map(|v| {
                let neighbors = adj[v].iter().map(|&u| (u, 1.0)).collect();
                Some(Community {
                    size: 1,
                    walk: walk_from(v, &adj, &walk_degree, self.steps),
                    neighbors,
                    degree: adj[v].len() as f64,
                })
            })
            .collect();

        let mut q = -communities
            .iter()
            .flatten()
            .map(|c| (c.degree / (2.0 * m)).powi(2))
            .sum::<f64>();
        let mut trace = vec![q];

        let mut heap = BinaryHeap::new();
        for (i, list) in adj.iter().enumerate() {
            for &j in list.iter().filter(|&&j| j > i) {
                let delta = delta_sigma(&communities, i, j, &walk_degree, n);
                heap.push(Candidate { delta, a: i, b: j });
            }
        }

        while let Some(Candidate { delta, a, b }) = heap.pop() {
            // stale entry: one side was merged already
            if communities[a].is_none() || communities[b].is_none() {
                continue;
            }
            let (Some(ca), Some(cb)) = (communities[a].take(), communities[b].take()) else {
                continue;
            };

            let between = ca.neighbors.get(&b).copied().unwrap_or(0.0);
            let id = dendrogram.add_merge(a, b, delta, ca.size + cb.size);
            q += between / m - 2.0 * ca.degree * cb.degree / (4.0 * m * m);
            trace.push(q);

            let mut neighbors = ca.neighbors;
            for (c, w) in cb.neighbors {
                *neighbors.entry(c).or_insert(0.0) += w;
            }
            let _ = neighbors.remove(&a);
            let _ = neighbors.remove(&b);

            for (&c, &w) in &neighbors {
                if let Some(other) = communities[c].as_mut() {
                    let _ = other.neighbors.remove(&a);
                    let _ = other.neighbors.remove(&b);
                    let _ = other.neighbors.insert(id, w);
                }
            }

            let size = ca.size + cb.size;
            let walk = mix(&ca.walk, ca.size, &cb.walk, cb.size);
            communities.push(Some(Community {
                size,
                walk,
                neighbors,
                degree: ca.degree + cb.degree,
            }));

            let targets: Vec<usize> = communities[id]
                .as_ref()
                .map(|c| c.neighbors.keys().copied().collect())
                .unwrap_or_default();
            for c in targets {
                let delta = delta_sigma(&communities, c, id, &walk_degree, n);
                heap.push(Candidate { delta, a: c, b: id });
            }
        }

        Ok((dendrogram, trace))
    }
}

impl Default for Walktrap {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunityDetection for Walktrap {
    fn detect<N, E>(&self, graph: &UnGraph<N, E>) -> Result<Vec<usize>> {
        let (dendrogram, trace) = self.hierarchy(graph)?;
        if trace.is_empty() {
            // No edges: each node is its own community
            return Ok((0..graph.node_count()).collect());
        }

        let mut best = 0;
        for (level, &q) in trace.iter().enumerate() {
            if q > trace[best] + 1e-12 {
                best = level;
            }
        }
        log::debug!(
            "Walktrap: {} merges, cut after {} (modularity {:.4})",
            dendrogram.n_merges(),
            best,
            trace[best]
        );
        dendrogram.cut(best)
    }
}

/// A live community during agglomeration.
struct Community {
    size: usize,
    /// Sparse `P^t_C`, sorted by node.
    walk: Vec<(usize, f64)>,
    /// Adjacent community -> number of edges between them.
    neighbors: BTreeMap<usize, f64>,
    degree: f64,
}

/// Heap entry; `BinaryHeap` is a max-heap so the ordering is reversed.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    delta: f64,
    a: usize,
    b: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .delta
            .total_cmp(&self.delta)
            .then_with(|| other.a.cmp(&self.a))
            .then_with(|| other.b.cmp(&self.b))
    }
}

/// End-point distribution of a `steps`-long walk from `start`.
fn walk_from(start: usize, adj: &[Vec<usize>], degree: &[f64], steps: usize) -> Vec<(usize, f64)> {
    // ordered so the summation order, and hence every bit of the result, is fixed
    let mut current: BTreeMap<usize, f64> = BTreeMap::from([(start, 1.0)]);
    for _ in 0..steps {
        let mut next: BTreeMap<usize, f64> = BTreeMap::new();
        for (&node, &p) in &current {
            let share = p / degree[node];
            *next.entry(node).or_insert(0.0) += share;
            for &neighbor in &adj[node] {
                *next.entry(neighbor).or_insert(0.0) += share;
            }
        }
        current = next;
    }
    current.into_iter().collect()
}

/// Size-weighted mean of two sparse walk vectors.
fn mix(a: &[(usize, f64)], size_a: usize, b: &[(usize, f64)], size_b: usize) -> Vec<(usize, f64)> {
    let (wa, wb) = (size_a as f64, size_b as f64);
    let total = wa + wb;
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        match (a.get(i), b.get(j)) {
            (Some(&(ka, pa)), Some(&(kb, pb))) if ka == kb => {
                out.push((ka, (wa * pa + wb * pb) / total));
                i += 1;
                j += 1;
            }
            (Some(&(ka, pa)), Some(&(kb, _))) if ka < kb => {
                out.push((ka, wa * pa / total));
                i += 1;
            }
            (Some(&(ka, pa)), None) => {
                out.push((ka, wa * pa / total));
                i += 1;
            }
            (_, Some(&(kb, pb))) => {
                out.push((kb, wb * pb / total));
                j += 1;
            }
            (None, None) => break,
        }
    }
    out
}

/// Squared walk distance `r²` between two sparse vectors.
fn distance2(a: &[(usize, f64)], b: &[(usize, f64)], degree: &[f64]) -> f64 {
    let mut r2 = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let (node, diff) = match (a.get(i), b.get(j)) {
            (Some(&(ka, pa)), Some(&(kb, pb))) if ka == kb => {
                i += 1;
                j += 1;
                (ka, pa - pb)
            }
            (Some(&(ka, pa)), Some(&(kb, _))) if ka < kb => {
                i += 1;
                (ka, pa)
            }
            (Some(&(ka, pa)), None) => {
                i += 1;
                (ka, pa)
            }
            (_, Some(&(kb, pb))) => {
                j += 1;
                (kb, -pb)
            }
            (None, None) => break,
        };
        r2 += diff * diff / degree[node];
    }
    r2
}

fn delta_sigma(communities: &[Option<Community>], a: usize, b: usize, degree: &[f64], n: usize) -> f64 {
    match (&communities[a], &communities[b]) {
        (Some(ca), Some(cb)) => {
            let (sa, sb) = (ca.size as f64, cb.size as f64);
            sa * sb / (sa + sb) * distance2(&ca.walk, &cb.walk, degree) / n as f64
        }
        _ => f64::INFINITY,
    }
}
