//! Newman–Girvan modularity of a partition.

use crate::error::{Error, Result};
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

/// Modularity of `membership` on an unweighted graph.
///
/// ```text
/// Q = Σ_c [ L_c / m - (d_c / 2m)² ]
/// ```
///
/// with `L_c` the edges inside community `c`, `d_c` its total degree and `m`
/// the edge count. Returns `None` when the graph has no edges, where the
/// quantity is undefined. Putting every node in one community gives exactly 0.
pub fn modularity<N, E>(graph: &UnGraph<N, E>, membership: &[usize]) -> Result<Option<f64>> {
    let n = graph.node_count();
    if membership.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: membership.len(),
        });
    }

    let m = graph.edge_count();
    if m == 0 {
        return Ok(None);
    }

    let k = membership.iter().copied().max().map_or(0, |c| c + 1);
    let mut internal = vec![0.0f64; k];
    let mut degree = vec![0.0f64; k];
    for edge in graph.edge_references() {
        let ci = membership[edge.source().index()];
        let cj = membership[edge.target().index()];
        degree[ci] += 1.0;
        degree[cj] += 1.0;
        if ci == cj {
            internal[ci] += 1.0;
        }
    }

    let m = m as f64;
    let q = internal
        .iter()
        .zip(&degree)
        .map(|(&l, &d)| l / m - (d / (2.0 * m)).powi(2))
        .sum();
    Ok(Some(q))
}
