//! Community detection and modularity for similarity networks.
//!
//! ## The Modularity Objective
//!
//! Partition quality is measured with Newman–Girvan **modularity**, the
//! fraction of edges inside communities minus the fraction expected under a
//! configuration-model null with the same degree sequence:
//!
//! ```text
//! Q = (1/2m) × Σ[A_ij - (k_i × k_j)/(2m)] × δ(c_i, c_j)
//! ```
//!
//! Edges are unweighted. A graph with no edges has no defined modularity and
//! [`modularity`] returns `None` for it; putting every node in one community
//! gives exactly 0.
//!
//! ## Algorithms
//!
//! ### Walktrap (default)
//!
//! Hierarchical agglomeration on random-walk distances (Pons & Latapy 2005).
//! The merge history is kept as a [`Dendrogram`](crate::hierarchy::Dendrogram)
//! and cut at the level of maximum modularity.
//!
//! ### Louvain
//!
//! Multi-level greedy modularity optimisation (Blondel et al. 2008).
//!
//! Both are deterministic for a given graph, so replicate-to-replicate
//! variation comes only from the sampled node set.
//!
//! ## Usage
//!
//! ```rust
//! use petgraph::graph::UnGraph;
//! use phylonet::community::{modularity, CommunityDetection, Walktrap};
//!
//! let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (0, 2), (3, 4)]);
//! let communities = Walktrap::new().detect(&graph).unwrap();
//! let q = modularity(&graph, &communities).unwrap();
//! assert!(q.unwrap() > 0.0);
//! ```

mod louvain;
mod modularity;
mod traits;
mod walktrap;

pub use louvain::Louvain;
pub use modularity::modularity;
pub use traits::CommunityDetection;
pub use walktrap::Walktrap;
