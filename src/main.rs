use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use phylonet::congruence::{self, Taxonomy, DEFAULT_MODE, DEFAULT_THRESHOLDS};
use phylonet::experiment::{Experiment, ExperimentConfig, Method};
use phylonet::io::{load_edge_list, load_node_table, write_replicates, write_summary_json};
use phylonet::NodeTable;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stratified subsampling of a similarity network: per-phylum capped
    /// samples, community detection and modularity against the full network.
    Subsample(SubsampleArgs),
    /// Adjusted Rand Index between AAI-threshold clusters and taxonomic ranks.
    Congruence(CongruenceArgs),
}

#[derive(Args, Debug)]
struct SubsampleArgs {
    #[arg(short = 'n', long)]
    /// Node metadata table (TSV, or CSV by extension). First column is the
    /// node identifier
    nodes: PathBuf,

    #[arg(short = 'e', long)]
    /// Tab-delimited edge list without header: source and target identifiers
    edges: PathBuf,

    #[arg(short = 'k', long)]
    /// Maximum number of nodes sampled per phylum
    sampling_size: usize,

    #[arg(short = 'r', long, default_value_t = 100)]
    /// Number of subsampling replicates
    replicates: usize,

    #[arg(short = 's', long, default_value_t = 42)]
    /// Seed for the random number generators; replicate i uses seed + i + 1
    seed: u64,

    #[arg(long, default_value = "Phylum")]
    /// Name of the phylum column in the node table
    phylum_column: String,

    #[arg(short = 'm', long, default_value_t = Method::Walktrap)]
    /// Community detection method: walktrap or louvain
    method: Method,

    #[arg(long, default_value_t = 4)]
    /// Random walk length for walktrap
    walk_length: usize,

    #[arg(short = 'o', long)]
    /// Output TSV with one row per replicate
    output: PathBuf,

    #[arg(long)]
    /// Optional JSON summary (baseline, replicate mean and SD, test)
    summary: Option<PathBuf>,

    #[arg(long)]
    /// Optional TSV of the baseline partition: node, phylum, community
    partition: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CongruenceArgs {
    #[arg(short = 't', long)]
    /// Taxonomy reference TSV (Seq_ID, Genus, Family, Order, Phylum)
    taxonomy: PathBuf,

    #[arg(short = 'c', long)]
    /// Directory with one subdirectory per coverage mode holding
    /// labels_id_<threshold>.tsv files
    cluster_dir: PathBuf,

    #[arg(long, value_delimiter = ',', default_value = DEFAULT_MODE)]
    /// Coverage modes to analyse (comma separated)
    modes: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    /// AAI thresholds (comma separated). Defaults to 0.90,0.70,0.50,0.30
    thresholds: Vec<f64>,

    #[arg(short = 'o', long)]
    /// Output path for the ARI summary matrix
    output: PathBuf,

    #[arg(long)]
    /// Optional long-format table, one row per mode, rank and threshold
    long: Option<PathBuf>,
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    config: &'a ExperimentConfig,
    cleaning: phylonet::CleaningReport,
    baseline_communities: Option<usize>,
    phylum_agreement: Option<f64>,
    phylum_nmi: Option<f64>,
    #[serde(flatten)]
    summary: phylonet::Summary,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn subsample_process(args: SubsampleArgs) -> Result<()> {
    let nodes = load_node_table(&args.nodes, &args.phylum_column)
        .with_context(|| format!("reading node table {}", args.nodes.display()))?;
    let edges =
        load_edge_list(&args.edges).with_context(|| format!("reading edge list {}", args.edges.display()))?;

    let config = ExperimentConfig::new(args.sampling_size)
        .with_replicates(args.replicates)
        .with_seed(args.seed)
        .with_method(args.method)
        .with_walk_length(args.walk_length);
    let experiment = Experiment::run(&nodes, edges, config)?;

    write_replicates(create(&args.output)?, &experiment)?;
    log::info!("Replicate table written to {}", args.output.display());

    let summary = experiment.summary();
    if let Some(path) = &args.summary {
        let report = SummaryReport {
            config: &experiment.config,
            cleaning: experiment.cleaning,
            baseline_communities: experiment.baseline.communities,
            phylum_agreement: experiment.phylum_agreement,
            phylum_nmi: experiment.phylum_nmi,
            summary: summary.clone(),
        };
        write_summary_json(create(path)?, &report)?;
        log::info!("Summary written to {}", path.display());
    } else {
        log::debug!("No summary path given; JSON summary skipped");
    }

    if let Some(path) = &args.partition {
        write_partition(create(path)?, &nodes, experiment.baseline_partition())?;
    }

    println!("{summary}");
    if let Some(agreement) = experiment.phylum_agreement {
        println!("Community/phylum ARI:   {agreement:.4}");
    }
    if let Some(nmi) = experiment.phylum_nmi {
        println!("Community/phylum NMI:   {nmi:.4}");
    }
    Ok(())
}

fn write_partition<W: Write>(mut writer: W, nodes: &NodeTable, membership: &[usize]) -> Result<()> {
    writeln!(writer, "node\tphylum\tcommunity")?;
    for (i, community) in membership.iter().enumerate() {
        writeln!(writer, "{}\t{}\t{}", nodes.id(i), nodes.phylum(i), community)?;
    }
    writer.flush()?;
    Ok(())
}

fn congruence_process(args: CongruenceArgs) -> Result<()> {
    let taxonomy = Taxonomy::from_path(&args.taxonomy)
        .with_context(|| format!("reading taxonomy {}", args.taxonomy.display()))?;
    let thresholds = if args.thresholds.is_empty() {
        DEFAULT_THRESHOLDS.to_vec()
    } else {
        args.thresholds
    };

    let rows = congruence::analyze(&taxonomy, &args.cluster_dir, &args.modes, &thresholds)?;

    let mut pivot = Vec::new();
    congruence::write_pivot(&mut pivot, &rows)?;
    println!("--- ARI Summary Matrix ---");
    print!("{}", String::from_utf8_lossy(&pivot));
    let mut out = create(&args.output)?;
    out.write_all(&pivot)?;
    out.flush()?;
    log::info!("Results saved to {}", args.output.display());

    if let Some(path) = &args.long {
        congruence::write_long(create(path)?, &rows)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    match args.command {
        Commands::Subsample(cmd_args) => subsample_process(cmd_args).context("subcommand 'subsample'"),
        Commands::Congruence(cmd_args) => congruence_process(cmd_args).context("subcommand 'congruence'"),
    }
}
