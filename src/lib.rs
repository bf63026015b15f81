//! # phylonet
//!
//! Robustness of community structure in viral similarity networks.
//!
//! A network of sequence clusters (nodes tagged with a phylum, edges for
//! similarity above a threshold) is resampled many times with a fixed cap per
//! phylum. Each sample's induced sub-network is partitioned with walktrap and
//! scored by modularity, and the replicate distribution is compared with the
//! score of the full network. Phyla with many members therefore cannot
//! dominate the apparent modular structure.
//!
//! A second analysis scores operational (AAI threshold) clusters against
//! reference taxonomy with the Adjusted Rand Index.
//!
//! ```rust
//! use phylonet::{Experiment, ExperimentConfig, NodeTable, RawEdge};
//!
//! let nodes = NodeTable::new([("A", "phy1"), ("B", "phy1"), ("C", "phy2"), ("D", "phy2")]).unwrap();
//! let edges = vec![RawEdge::new("A", "B"), RawEdge::new("C", "D")];
//! let experiment = Experiment::run(&nodes, edges, ExperimentConfig::new(2).with_replicates(5)).unwrap();
//! let summary = experiment.summary();
//! assert_eq!(summary.scored, 5);
//! ```

pub mod community;
pub mod congruence;
/// Error types used across `phylonet`.
pub mod error;
pub mod experiment;
pub mod hierarchy;
pub mod io;
pub mod metrics;
pub mod network;
pub mod sampling;
pub mod stats;

pub use community::{modularity, CommunityDetection, Louvain, Walktrap};
pub use error::{Error, Result};
pub use experiment::{Evaluation, Experiment, ExperimentConfig, Method, Replicate};
pub use hierarchy::Dendrogram;
pub use metrics::{ari, nmi};
pub use network::{clean_edges, CleaningReport, Network, NodeTable, RawEdge};
pub use sampling::StratifiedSampler;
pub use stats::Summary;
