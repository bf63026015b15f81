//! Community detection traits.

use crate::error::Result;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

/// Trait for community detection algorithms.
pub trait CommunityDetection {
    /// Detect communities in a graph.
    ///
    /// Returns a mapping from node index to community ID. IDs are
    /// consecutive from 0.
    fn detect<N, E>(&self, graph: &UnGraph<N, E>) -> Result<Vec<usize>>;
}

/// Sorted, deduplicated neighbour lists without self-loops.
pub(crate) fn neighbor_lists<N, E>(graph: &UnGraph<N, E>) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); graph.node_count()];
    for edge in graph.edge_references() {
        let (i, j) = (edge.source().index(), edge.target().index());
        if i != j {
            adj[i].push(j);
            adj[j].push(i);
        }
    }
    for list in &mut adj {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Relabel communities to consecutive integers by first appearance.
pub(crate) fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut map = std::collections::HashMap::new();
    labels
        .iter()
        .map(|&c| {
            let next = map.len();
            *map.entry(c).or_insert(next)
        })
        .collect()
}
