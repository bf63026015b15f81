//! Phylum-stratified subsampling.
//!
//! Each stratum is sampled on its own: `min(stratum_size, k)` members drawn
//! uniformly without replacement. There is no balancing across strata beyond
//! that cap, so small phyla are always taken whole.

use crate::error::{Error, Result};
use crate::network::{NodeTable, Stratum};
use rand::seq::index;
use rand::Rng;

/// Stratified sampler over the phyla of a node table.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSampler<'a> {
    strata: &'a [Stratum],
}

impl<'a> StratifiedSampler<'a> {
    /// Create a sampler for the strata of `nodes`.
    pub fn new(nodes: &'a NodeTable) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::EmptyInput("node table has no nodes"));
        }
        Self::from_strata(nodes.strata())
    }

    /// Create a sampler over explicit strata.
    pub fn from_strata(strata: &'a [Stratum]) -> Result<Self> {
        if strata.is_empty() || strata.iter().all(|s| s.members.is_empty()) {
            return Err(Error::EmptyInput("no strata to sample from"));
        }
        Ok(Self { strata })
    }

    /// Number of nodes a draw with cap `k` returns.
    pub fn sample_size(&self, k: usize) -> usize {
        self.strata.iter().map(|s| s.members.len().min(k)).sum()
    }

    /// Draw one stratified sample with per-stratum cap `k`.
    ///
    /// Returns node indices in ascending order. Consumes randomness from `rng`
    /// only; repeated calls with independently seeded generators are
    /// independent.
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<usize>> {
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "sampling_size",
                message: "must be at least 1".to_string(),
            });
        }

        let mut chosen = Vec::with_capacity(self.sample_size(k));
        for stratum in self.strata {
            let n = stratum.members.len();
            if n <= k {
                chosen.extend_from_slice(&stratum.members);
            } else {
                chosen.extend(index::sample(rng, n, k).iter().map(|i| stratum.members[i]));
            }
        }
        chosen.sort_unstable();
        Ok(chosen)
    }
}
