//! Hierarchical structures produced by agglomerative community detection.

mod dendrogram;

pub use dendrogram::{Dendrogram, Merge};
