//! Node table, edge validation and (sub-)network construction.
//!
//! Nodes carry a categorical phylum that later defines the sampling strata.
//! Edges arrive as identifier pairs and are validated against the node table
//! once; after that everything works on dense node indices.
//!
//! ```rust
//! use phylonet::network::{clean_edges, index_edges, Network, NodeTable, RawEdge};
//!
//! let nodes = NodeTable::new([("A", "phy1"), ("B", "phy1"), ("C", "phy2")]).unwrap();
//! let raw = vec![RawEdge::new("A", "B"), RawEdge::new("B", "Z")];
//! let (cleaned, report) = clean_edges(&nodes, raw);
//! assert_eq!(report.dropped, 1);
//!
//! let edges = index_edges(&nodes, &cleaned);
//! let network = Network::full(nodes.len(), &edges);
//! assert_eq!(network.edge_count(), 1);
//! ```

use crate::error::{Error, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Label used for nodes whose phylum cell is empty.
pub const MISSING_PHYLUM: &str = "NA";

/// One phylum and the indices of its member nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stratum {
    /// Phylum label.
    pub name: String,
    /// Node indices, in table order.
    pub members: Vec<usize>,
}

/// Immutable node set with phylum strata.
#[derive(Debug, Clone)]
pub struct NodeTable {
    ids: Vec<String>,
    stratum_of: Vec<usize>,
    strata: Vec<Stratum>,
    index: HashMap<String, usize>,
}

impl NodeTable {
    /// Build a node table from `(id, phylum)` rows.
    ///
    /// Duplicate identifiers keep the first row. Strata are ordered by first
    /// appearance of the phylum.
    pub fn new<I, S, P>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: AsRef<str>,
    {
        let mut ids = Vec::new();
        let mut stratum_of = Vec::new();
        let mut strata: Vec<Stratum> = Vec::new();
        let mut stratum_index: HashMap<String, usize> = HashMap::new();
        let mut index = HashMap::new();
        let mut duplicates = 0usize;

        for (id, phylum) in rows {
            let id = id.into();
            if index.contains_key(&id) {
                duplicates += 1;
                continue;
            }
            let phylum = match phylum.as_ref().trim() {
                "" => MISSING_PHYLUM,
                p => p,
            };
            let s = match stratum_index.get(phylum) {
                Some(&s) => s,
                None => {
                    strata.push(Stratum {
                        name: phylum.to_string(),
                        members: Vec::new(),
                    });
                    let _ = stratum_index.insert(phylum.to_string(), strata.len() - 1);
                    strata.len() - 1
                }
            };
            let node = ids.len();
            strata[s].members.push(node);
            stratum_of.push(s);
            let _ = index.insert(id.clone(), node);
            ids.push(id);
        }

        if duplicates > 0 {
            log::warn!("Ignored {duplicates} duplicate node identifier(s); first occurrence kept");
        }
        if ids.is_empty() {
            return Err(Error::EmptyInput("node table has no nodes"));
        }
        if strata.is_empty() {
            return Err(Error::EmptyInput("node table has no phylum strata"));
        }

        Ok(Self {
            ids,
            stratum_of,
            strata,
            index,
        })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier of node `i`.
    pub fn id(&self, i: usize) -> &str {
        &self.ids[i]
    }

    /// Phylum of node `i`.
    pub fn phylum(&self, i: usize) -> &str {
        &self.strata[self.stratum_of[i]].name
    }

    /// Stratum index of node `i`.
    pub fn stratum_of(&self, i: usize) -> usize {
        self.stratum_of[i]
    }

    /// Index of the node with identifier `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// All phylum strata.
    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }
}

/// An edge as read from the edge list, by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
}

impl RawEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Edge counts before and after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleaningReport {
    /// Edges read.
    pub input: usize,
    /// Edges whose endpoints are both known nodes.
    pub retained: usize,
    /// Edges removed for referencing an unknown node.
    pub dropped: usize,
}

/// Drop every edge with an endpoint missing from `nodes`.
///
/// Order is preserved and nothing else is touched (duplicates and self-loops
/// are resolved at graph construction), so cleaning is idempotent.
pub fn clean_edges(nodes: &NodeTable, raw: Vec<RawEdge>) -> (Vec<RawEdge>, CleaningReport) {
    let input = raw.len();
    let cleaned: Vec<RawEdge> = raw
        .into_iter()
        .filter(|e| nodes.index_of(&e.source).is_some() && nodes.index_of(&e.target).is_some())
        .collect();

    let report = CleaningReport {
        input,
        retained: cleaned.len(),
        dropped: input - cleaned.len(),
    };
    log::info!(
        "Edge cleaning: {} edges in, {} retained, {} dropped (unknown node)",
        report.input,
        report.retained,
        report.dropped
    );
    (cleaned, report)
}

/// Translate identifier edges into node-index pairs. Unknown endpoints are skipped.
pub fn index_edges(nodes: &NodeTable, edges: &[RawEdge]) -> Vec<(usize, usize)> {
    edges
        .iter()
        .filter_map(|e| Some((nodes.index_of(&e.source)?, nodes.index_of(&e.target)?)))
        .collect()
}

/// Undirected simple graph over a subset of the node table.
///
/// Vertex weights are node-table indices, so a community label at graph
/// position `p` belongs to node `graph[NodeIndex::new(p)]`.
#[derive(Debug, Clone)]
pub struct Network {
    graph: UnGraph<usize, ()>,
}

impl Network {
    /// Graph over every node in the table.
    pub fn full(n_nodes: usize, edges: &[(usize, usize)]) -> Self {
        let all: Vec<usize> = (0..n_nodes).collect();
        Self::induced(n_nodes, edges, &all)
    }

    /// Graph over `subset`, keeping edges whose endpoints are both in it.
    ///
    /// Vertices are added in `subset` order. Self-loops are skipped and
    /// parallel edges (either orientation) collapse to one.
    pub fn induced(n_nodes: usize, edges: &[(usize, usize)], subset: &[usize]) -> Self {
        let mut graph = UnGraph::with_capacity(subset.len(), 0);
        let mut local: Vec<Option<NodeIndex>> = vec![None; n_nodes];
        for &node in subset {
            if local[node].is_none() {
                local[node] = Some(graph.add_node(node));
            }
        }

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for &(u, v) in edges {
            if u == v {
                continue;
            }
            let (Some(a), Some(b)) = (local[u], local[v]) else {
                continue;
            };
            let key = if u < v { (u, v) } else { (v, u) };
            if seen.insert(key) {
                let _ = graph.add_edge(a, b, ());
            }
        }

        Self { graph }
    }

    /// Underlying petgraph graph.
    pub fn graph(&self) -> &UnGraph<usize, ()> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn four_nodes() -> NodeTable {
        NodeTable::new([("A", "phy1"), ("B", "phy1"), ("C", "phy2"), ("D", "phy2")]).unwrap()
    }

    #[test]
    fn test_strata_follow_first_appearance() {
        let nodes = NodeTable::new([("x", "b"), ("y", "a"), ("z", "b"), ("w", "")]).unwrap();
        let names: Vec<&str> = nodes.strata().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a", MISSING_PHYLUM]);
        assert_eq!(nodes.strata()[0].members, vec![0, 2]);
        assert_eq!(nodes.phylum(3), MISSING_PHYLUM);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let nodes = NodeTable::new([("A", "p1"), ("A", "p2"), ("B", "p2")]).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.phylum(0), "p1");
        assert_eq!(nodes.index_of("B"), Some(1));
    }

    #[test]
    fn test_empty_table_is_fatal() {
        let rows: Vec<(String, String)> = Vec::new();
        assert!(matches!(NodeTable::new(rows), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_unknown_node_edges_dropped_and_counted() {
        let nodes = four_nodes();
        let raw = vec![
            RawEdge::new("A", "B"),
            RawEdge::new("Z", "A"),
            RawEdge::new("C", "D"),
            RawEdge::new("D", "Z"),
        ];
        let (cleaned, report) = clean_edges(&nodes, raw);
        assert_eq!(report.input, 4);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.retained, 2);
        assert!(cleaned.iter().all(|e| e.source != "Z" && e.target != "Z"));
    }

    #[test]
    fn test_induced_graph_is_simple() {
        let edges = vec![(0, 1), (1, 0), (0, 1), (2, 2), (2, 3), (1, 2)];
        let network = Network::induced(4, &edges, &[0, 1, 2]);
        assert_eq!(network.node_count(), 3);
        // (0,1) once, (1,2) once; the loop and the edge to 3 are gone
        assert_eq!(network.edge_count(), 2);
        let members: Vec<usize> = network.graph().node_weights().copied().collect();
        assert_eq!(members, vec![0, 1, 2]);
    }

    #[test]
    fn test_induced_graph_keeps_isolated_nodes() {
        let network = Network::induced(4, &[(0, 1)], &[0, 2, 3]);
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 0);
    }

    proptest! {
        #[test]
        fn cleaning_is_idempotent(
            pairs in proptest::collection::vec((0usize..8, 0usize..8), 0..40),
        ) {
            // ids 0..5 exist, 5..8 do not
            let nodes = NodeTable::new((0..5).map(|i| (i.to_string(), (i % 2).to_string()))).unwrap();
            let raw: Vec<RawEdge> = pairs
                .iter()
                .map(|(a, b)| RawEdge::new(a.to_string(), b.to_string()))
                .collect();
            let (once, _) = clean_edges(&nodes, raw);
            let (twice, report) = clean_edges(&nodes, once.clone());
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(report.dropped, 0);
        }
    }
}
