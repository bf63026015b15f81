//! Merge history of agglomerative community detection.
//!
//! Leaves are `0..n_items`. Merge `i` creates the cluster `n_items + i`, so a
//! merge may reference leaves or earlier merges. Walktrap on a disconnected
//! graph stops before everything is joined; the dendrogram is then a forest.

use crate::error::{Error, Result};

/// A recorded sequence of merges.
#[derive(Debug, Clone, Default)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

/// A single merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// First cluster being merged.
    pub left: usize,
    /// Second cluster being merged.
    pub right: usize,
    /// Merge cost (Δσ for walktrap).
    pub cost: f64,
    /// Number of leaves in the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create an empty dendrogram over `n_items` leaves.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge and return the id of the new cluster.
    pub fn add_merge(&mut self, left: usize, right: usize, cost: f64, size: usize) -> usize {
        self.merges.push(Merge {
            left,
            right,
            cost,
            size,
        });
        self.n_items + self.merges.len() - 1
    }

    /// Membership after applying the first `n_merges` merges.
    ///
    /// Labels are consecutive, numbered by first appearance among the leaves.
    pub fn cut(&self, n_merges: usize) -> Result<Vec<usize>> {
        if n_merges > self.merges.len() {
            return Err(Error::InvalidParameter {
                name: "n_merges",
                message: format!("dendrogram only has {} merges", self.merges.len()),
            });
        }

        let total = self.n_items + n_merges;
        let mut parent: Vec<usize> = (0..total).collect();
        for (i, merge) in self.merges.iter().take(n_merges).enumerate() {
            let id = self.n_items + i;
            parent[merge.left] = id;
            parent[merge.right] = id;
        }

        let mut label_of_root = vec![usize::MAX; total];
        let mut next = 0;
        let mut membership = Vec::with_capacity(self.n_items);
        for leaf in 0..self.n_items {
            let mut root = leaf;
            while parent[root] != root {
                root = parent[root];
            }
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next;
                next += 1;
            }
            membership.push(label_of_root[root]);
        }
        Ok(membership)
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_levels() {
        let mut dendro = Dendrogram::new(4);
        let ab = dendro.add_merge(0, 1, 0.1, 2);
        let cd = dendro.add_merge(2, 3, 0.2, 2);
        assert_eq!((ab, cd), (4, 5));
        dendro.add_merge(ab, cd, 0.9, 4);

        assert_eq!(dendro.cut(0).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(dendro.cut(1).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(dendro.cut(2).unwrap(), vec![0, 0, 1, 1]);
        assert_eq!(dendro.cut(3).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_cut_beyond_history_fails() {
        let dendro = Dendrogram::new(3);
        assert!(dendro.cut(1).is_err());
        assert_eq!(dendro.cut(0).unwrap(), vec![0, 1, 2]);
    }
}
