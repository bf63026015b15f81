//! The stratified subsampling robustness experiment.
//!
//! 1. Clean the edge list against the node table.
//! 2. Baseline: detect communities on the full network and score them.
//! 3. Replicates: sample `min(|phylum|, k)` nodes per phylum, rebuild the
//!    induced network, detect and score again.
//!
//! Replicate `i` draws from its own generator seeded with
//! `seed.wrapping_add(i + 1)`, so results do not depend on whether the
//! replicates run in sequence or on the rayon pool. A replicate whose
//! sub-network has no edges is recorded as missing.

use crate::community::{modularity, CommunityDetection, Louvain, Walktrap};
use crate::error::{Error, Result};
use crate::metrics::{ari, nmi};
use crate::network::{clean_edges, index_edges, CleaningReport, Network, NodeTable, RawEdge};
use crate::sampling::StratifiedSampler;
use crate::stats::Summary;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Community detection algorithm used for every network in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Walktrap,
    Louvain,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "walktrap" => Ok(Self::Walktrap),
            "louvain" => Ok(Self::Louvain),
            other => Err(format!("unknown method '{other}' (expected walktrap or louvain)")),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Walktrap => write!(f, "walktrap"),
            Self::Louvain => write!(f, "louvain"),
        }
    }
}

/// Parameters of one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentConfig {
    /// Number of subsampling replicates.
    pub replicates: usize,
    /// Per-phylum sample cap.
    pub sampling_size: usize,
    /// Base seed for the per-replicate generators.
    pub seed: u64,
    pub method: Method,
    /// Walk length for walktrap.
    pub walk_length: usize,
}

impl ExperimentConfig {
    /// Defaults: 100 replicates, seed 42, walktrap with walk length 4.
    pub fn new(sampling_size: usize) -> Self {
        Self {
            replicates: 100,
            sampling_size,
            seed: 42,
            method: Method::Walktrap,
            walk_length: 4,
        }
    }

    pub fn with_replicates(mut self, replicates: usize) -> Self {
        self.replicates = replicates;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.walk_length = walk_length;
        self
    }

    /// Reject parameter values no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.sampling_size == 0 {
            return Err(Error::InvalidParameter {
                name: "sampling_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.method == Method::Walktrap && self.walk_length == 0 {
            return Err(Error::InvalidParameter {
                name: "walk_length",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Seed of replicate `i` (0-based).
    pub fn replicate_seed(&self, i: usize) -> u64 {
        self.seed.wrapping_add(i as u64 + 1)
    }

    fn detect(&self, network: &Network) -> Result<Vec<usize>> {
        match self.method {
            Method::Walktrap => Walktrap::new()
                .with_steps(self.walk_length)
                .detect(network.graph()),
            Method::Louvain => Louvain::new().detect(network.graph()),
        }
    }
}

/// Communities and modularity of one network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub nodes: usize,
    pub edges: usize,
    /// Community count, `None` when the network has no edges.
    pub communities: Option<usize>,
    /// Modularity, `None` when the network has no edges.
    pub modularity: Option<f64>,
    /// Community of each vertex, in graph order. Empty when there are no edges.
    #[serde(skip)]
    pub membership: Vec<usize>,
}

/// One subsampling replicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replicate {
    /// 1-based replicate number.
    pub index: usize,
    pub nodes: usize,
    pub edges: usize,
    pub communities: Option<usize>,
    pub modularity: Option<f64>,
}

/// Detect communities on `network` and score them.
pub fn evaluate(network: &Network, config: &ExperimentConfig) -> Result<Evaluation> {
    let nodes = network.node_count();
    let edges = network.edge_count();
    if edges == 0 {
        return Ok(Evaluation {
            nodes,
            edges,
            communities: None,
            modularity: None,
            membership: Vec::new(),
        });
    }

    let membership = config.detect(network)?;
    let q = modularity(network.graph(), &membership)?;
    let communities = membership.iter().copied().max().map(|c| c + 1);
    Ok(Evaluation {
        nodes,
        edges,
        communities,
        modularity: q,
        membership,
    })
}

/// Output of a full run.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub config: ExperimentConfig,
    pub cleaning: CleaningReport,
    pub baseline: Evaluation,
    /// Replicates in index order.
    pub replicates: Vec<Replicate>,
    /// ARI between baseline communities and phylum labels.
    pub phylum_agreement: Option<f64>,
    /// NMI between baseline communities and phylum labels.
    pub phylum_nmi: Option<f64>,
}

impl Experiment {
    /// Run the baseline and all replicates.
    pub fn run(nodes: &NodeTable, raw_edges: Vec<RawEdge>, config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let sampler = StratifiedSampler::new(nodes)?;

        let (cleaned, cleaning) = clean_edges(nodes, raw_edges);
        let edges = index_edges(nodes, &cleaned);

        for stratum in nodes.strata() {
            log::debug!(
                "Stratum '{}': {} nodes, {} sampled per replicate",
                stratum.name,
                stratum.members.len(),
                stratum.members.len().min(config.sampling_size)
            );
        }

        let full = Network::full(nodes.len(), &edges);
        let baseline = evaluate(&full, &config)?;
        log::info!(
            "Baseline network: {} nodes, {} edges, modularity {}",
            baseline.nodes,
            baseline.edges,
            baseline
                .modularity
                .map_or_else(|| "NA".to_string(), |q| format!("{q:.4}"))
        );

        let (phylum_agreement, phylum_nmi) = if baseline.membership.is_empty() {
            (None, None)
        } else {
            let phyla: Vec<usize> = full
                .graph()
                .node_indices()
                .map(|v| nodes.stratum_of(full.graph()[v]))
                .collect();
            (
                Some(ari(&baseline.membership, &phyla)),
                Some(nmi(&baseline.membership, &phyla)),
            )
        };

        log::info!(
            "Running {} replicates with {} nodes each (cap {} per phylum, {})",
            config.replicates,
            sampler.sample_size(config.sampling_size),
            config.sampling_size,
            config.method
        );
        let run_one = |i: usize| run_replicate(i, &sampler, nodes.len(), &edges, &config);

        #[cfg(feature = "parallel")]
        let replicates = (0..config.replicates)
            .into_par_iter()
            .map(run_one)
            .collect::<Result<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let replicates = (0..config.replicates)
            .map(run_one)
            .collect::<Result<Vec<_>>>()?;

        let missing = replicates.iter().filter(|r| r.modularity.is_none()).count();
        if missing > 0 {
            log::warn!("{missing} replicate(s) had no edges and are recorded as missing");
        }

        Ok(Self {
            config,
            cleaning,
            baseline,
            replicates,
            phylum_agreement,
            phylum_nmi,
        })
    }

    /// Replicate scores in order, `None` for missing.
    pub fn scores(&self) -> Vec<Option<f64>> {
        self.replicates.iter().map(|r| r.modularity).collect()
    }

    /// Baseline against replicate distribution.
    pub fn summary(&self) -> Summary {
        Summary::new(self.baseline.modularity, &self.scores())
    }

    /// Community of every node in the baseline network, by node-table index.
    ///
    /// The full network holds every node in table order, so graph position
    /// and table index coincide. Empty when the network has no edges.
    pub fn baseline_partition(&self) -> &[usize] {
        &self.baseline.membership
    }
}

fn run_replicate(
    i: usize,
    sampler: &StratifiedSampler<'_>,
    n_nodes: usize,
    edges: &[(usize, usize)],
    config: &ExperimentConfig,
) -> Result<Replicate> {
    let mut rng = StdRng::seed_from_u64(config.replicate_seed(i));
    let subset = sampler.sample(config.sampling_size, &mut rng)?;
    let network = Network::induced(n_nodes, edges, &subset);
    let evaluation = evaluate(&network, config)?;
    log::debug!(
        "Replicate {}: {} nodes, {} edges",
        i + 1,
        evaluation.nodes,
        evaluation.edges
    );

    Ok(Replicate {
        index: i + 1,
        nodes: evaluation.nodes,
        edges: evaluation.edges,
        communities: evaluation.communities,
        modularity: evaluation.modularity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_nodes() -> NodeTable {
        NodeTable::new([("A", "phy1"), ("B", "phy1"), ("C", "phy2"), ("D", "phy2")]).unwrap()
    }

    #[test]
    fn test_replicates_at_cap_equal_baseline() {
        let nodes = four_nodes();
        let edges = vec![RawEdge::new("A", "B"), RawEdge::new("C", "D")];
        let config = ExperimentConfig::new(2).with_replicates(10);
        let experiment = Experiment::run(&nodes, edges, config).unwrap();

        let baseline = experiment.baseline.modularity.unwrap();
        assert!((baseline - 0.5).abs() < 1e-12);
        assert_eq!(experiment.replicates.len(), 10);
        for (i, replicate) in experiment.replicates.iter().enumerate() {
            assert_eq!(replicate.index, i + 1);
            assert_eq!(replicate.nodes, 4);
            assert_eq!(replicate.edges, 2);
            assert_eq!(replicate.modularity, Some(baseline));
        }
        assert_eq!(experiment.phylum_agreement, Some(1.0));
        assert!((experiment.phylum_nmi.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_edgeless_replicates_are_missing_not_zero() {
        // one node per phylum: no edge can survive sampling
        let nodes = NodeTable::new([("A", "p1"), ("B", "p2"), ("C", "p1"), ("D", "p2")]).unwrap();
        let edges = vec![RawEdge::new("A", "C"), RawEdge::new("B", "D")];
        let config = ExperimentConfig::new(1).with_replicates(5);
        let experiment = Experiment::run(&nodes, edges, config).unwrap();

        assert!(experiment.baseline.modularity.is_some());
        for replicate in &experiment.replicates {
            assert_eq!(replicate.edges, 0);
            assert_eq!(replicate.modularity, None);
            assert_eq!(replicate.communities, None);
        }
        let summary = experiment.summary();
        assert_eq!(summary.missing, 5);
        assert_eq!(summary.mean, None);
    }

    #[test]
    fn test_same_seed_same_replicates() {
        let rows: Vec<(String, String)> = (0..40)
            .map(|i| (format!("v{i}"), format!("p{}", i % 3)))
            .collect();
        let nodes = NodeTable::new(rows).unwrap();
        let edges: Vec<RawEdge> = (0..40)
            .flat_map(|i| {
                [
                    RawEdge::new(format!("v{i}"), format!("v{}", (i + 1) % 40)),
                    RawEdge::new(format!("v{i}"), format!("v{}", (i + 7) % 40)),
                ]
            })
            .collect();

        let config = ExperimentConfig::new(6).with_replicates(8).with_seed(7);
        let a = Experiment::run(&nodes, edges.clone(), config.clone()).unwrap();
        let b = Experiment::run(&nodes, edges, config).unwrap();
        assert_eq!(a.replicates, b.replicates);
        assert!(a.replicates.iter().all(|r| r.nodes == 18));
    }

    #[test]
    fn test_sequential_replicates_match_run() {
        let rows: Vec<(String, String)> = (0..30)
            .map(|i| (format!("v{i}"), format!("p{}", i % 2)))
            .collect();
        let nodes = NodeTable::new(rows).unwrap();
        let raw: Vec<RawEdge> = (0..30)
            .flat_map(|i| {
                [
                    RawEdge::new(format!("v{i}"), format!("v{}", (i + 1) % 30)),
                    RawEdge::new(format!("v{i}"), format!("v{}", (i + 5) % 30)),
                ]
            })
            .collect();
        let config = ExperimentConfig::new(8).with_replicates(6).with_seed(11);
        let experiment = Experiment::run(&nodes, raw.clone(), config.clone()).unwrap();

        let (cleaned, _) = clean_edges(&nodes, raw);
        let edges = index_edges(&nodes, &cleaned);
        let sampler = StratifiedSampler::new(&nodes).unwrap();
        let sequential: Vec<Replicate> = (0..config.replicates)
            .map(|i| run_replicate(i, &sampler, nodes.len(), &edges, &config).unwrap())
            .collect();
        assert_eq!(sequential, experiment.replicates);
    }

    #[test]
    fn test_unknown_nodes_reported() {
        let nodes = four_nodes();
        let edges = vec![
            RawEdge::new("A", "B"),
            RawEdge::new("C", "Z"),
            RawEdge::new("Z", "Z"),
        ];
        let experiment = Experiment::run(&nodes, edges, ExperimentConfig::new(2).with_replicates(1)).unwrap();
        assert_eq!(experiment.cleaning.dropped, 2);
        assert_eq!(experiment.cleaning.retained, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let nodes = four_nodes();
        assert!(matches!(
            Experiment::run(&nodes, Vec::new(), ExperimentConfig::new(0)),
            Err(Error::InvalidParameter { name: "sampling_size", .. })
        ));
    }

    #[test]
    fn test_louvain_method() {
        let nodes = four_nodes();
        let edges = vec![RawEdge::new("A", "B"), RawEdge::new("C", "D")];
        let config = ExperimentConfig::new(2)
            .with_replicates(3)
            .with_method(Method::Louvain);
        let experiment = Experiment::run(&nodes, edges, config).unwrap();
        assert_eq!(experiment.baseline.communities, Some(2));
        assert!(experiment.scores().iter().all(|q| *q == experiment.baseline.modularity));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("Walktrap".parse::<Method>(), Ok(Method::Walktrap));
        assert_eq!("louvain".parse::<Method>(), Ok(Method::Louvain));
        assert!("leiden".parse::<Method>().is_err());
    }
}
