//! simgraph CLI
//!
//! Build, snapshot and query a similarity index from JSON records.
//!
//! # Usage
//!
//! ```bash
//! # Build a graph and snapshot it next to the data
//! simgraph build --data records.json --output index.kg --set min_build_size=100
//!
//! # Recover the snapshot and query it
//! simgraph search --data records.json --index index.kg --query 0.1,0.2 -k 5
//!
//! # Inspect a snapshot
//! simgraph stats --index index.kg
//! ```

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use simgraph::persist;
use simgraph::{
    Cosine, DotProduct, IndexConfig, L2Squared, Match, SearchHints, Similarity, SimilarityIndex,
    L2,
};
use simgraph_core::KGraph;

#[derive(Parser)]
#[command(name = "simgraph")]
#[command(about = "Mutable similarity index with a batch-built k-NN graph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    L2,
    L2sq,
    Dot,
    Cosine,
}

/// Options shared by commands that load records into an index.
#[derive(clap::Args)]
struct IndexArgs {
    /// JSON array of {"object", "tag", "vector"} records
    #[arg(short, long)]
    data: PathBuf,

    /// JSON index configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Config override, e.g. index.l=80 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    #[arg(long, value_enum, default_value = "l2")]
    metric: Metric,

    /// Brute force only; never build a graph
    #[arg(long)]
    linear: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert records, rebuild, and snapshot the graph
    Build {
        #[command(flatten)]
        args: IndexArgs,

        /// Path to the output graph file (a .meta sidecar is written next to it)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Insert records, recover a snapshot, and run one query
    Search {
        #[command(flatten)]
        args: IndexArgs,

        /// Graph file written by `build`
        #[arg(short, long)]
        index: Option<PathBuf>,

        /// Query vector (comma separated floats)
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        query: Vec<f32>,

        /// Number of results (0 uses the configured default)
        #[arg(short = 'k', long, default_value = "0")]
        k: i32,

        /// Search radius (0 uses the configured default)
        #[arg(short, long, default_value = "0")]
        radius: f32,
    },

    /// Display statistics about a graph snapshot
    Stats {
        #[arg(short, long)]
        index: PathBuf,
    },
}

#[derive(Deserialize)]
struct Record {
    object: u32,
    tag: u32,
    vector: Vec<f32>,
}

fn load_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading records {:?}", path))?;
    let records: Vec<Record> =
        serde_json::from_str(&text).with_context(|| format!("parsing records {:?}", path))?;
    if let Some(first) = records.first() {
        let dim = first.vector.len();
        ensure!(dim > 0, "records have empty vectors");
        ensure!(
            records.iter().all(|r| r.vector.len() == dim),
            "records must all have dimension {}",
            dim
        );
    }
    Ok(records)
}

fn load_config(args: &IndexArgs) -> anyhow::Result<IndexConfig> {
    let mut config = match &args.config {
        Some(path) => {
            IndexConfig::from_file(path).with_context(|| format!("loading config {:?}", path))?
        }
        None => IndexConfig::default(),
    };
    config.apply_overrides(args.overrides.iter().map(String::as_str))?;
    Ok(config)
}

fn populate<'a, S>(records: &'a [Record], config: IndexConfig, linear: bool) -> SimilarityIndex<'a, S>
where
    S: Similarity<Feature = [f32]>,
{
    let mut index = if linear {
        SimilarityIndex::linear(config)
    } else {
        SimilarityIndex::new(config)
    };
    for record in records {
        index.insert(record.object, record.tag, record.vector.as_slice());
    }
    tracing::info!(
        "Loaded {} records, metric {}, mode {:?}",
        records.len(),
        S::NAME,
        index.mode()
    );
    index
}

fn run_build<S>(records: &[Record], config: IndexConfig, linear: bool, output: &Path) -> anyhow::Result<()>
where
    S: Similarity<Feature = [f32]>,
{
    let mut index = populate::<S>(records, config, linear);
    index.rebuild();
    if index
        .snapshot(output)
        .with_context(|| format!("writing snapshot {:?}", output))?
    {
        if let Some(stats) = index.graph().map(KGraph::stats) {
            tracing::info!(
                "Graph built: {} nodes, {} edges, mean degree {:.1}",
                stats.nodes,
                stats.edges,
                stats.mean_degree
            );
        }
    } else {
        tracing::warn!(
            "No graph built for {} records (linear mode or below min_build_size); nothing written",
            index.len()
        );
    }
    Ok(())
}

fn run_search<S>(
    records: &[Record],
    config: IndexConfig,
    linear: bool,
    snapshot: Option<&Path>,
    query: &[f32],
    hints: SearchHints,
) -> anyhow::Result<Vec<Match>>
where
    S: Similarity<Feature = [f32]>,
{
    if let Some(first) = records.first() {
        ensure!(
            first.vector.len() == query.len(),
            "query has dimension {}, records have {}",
            query.len(),
            first.vector.len()
        );
    }
    let mut index = populate::<S>(records, config, linear);
    if let Some(path) = snapshot {
        let outcome = index.recover(path);
        tracing::info!("Recovery: {:?}", outcome);
    }
    index.rebuild();
    Ok(index.search(query, hints))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { args, output } => {
            let config = load_config(&args)?;
            let records = load_records(&args.data)?;
            match args.metric {
                Metric::L2 => run_build::<L2>(&records, config, args.linear, &output)?,
                Metric::L2sq => run_build::<L2Squared>(&records, config, args.linear, &output)?,
                Metric::Dot => run_build::<DotProduct>(&records, config, args.linear, &output)?,
                Metric::Cosine => run_build::<Cosine>(&records, config, args.linear, &output)?,
            }
        }

        Commands::Search {
            args,
            index,
            query,
            k,
            radius,
        } => {
            let config = load_config(&args)?;
            let records = load_records(&args.data)?;
            let hints = SearchHints { k, r: radius };
            let snapshot = index.as_deref();
            let matches = match args.metric {
                Metric::L2 => {
                    run_search::<L2>(&records, config, args.linear, snapshot, &query, hints)?
                }
                Metric::L2sq => {
                    run_search::<L2Squared>(&records, config, args.linear, snapshot, &query, hints)?
                }
                Metric::Dot => {
                    run_search::<DotProduct>(&records, config, args.linear, snapshot, &query, hints)?
                }
                Metric::Cosine => {
                    run_search::<Cosine>(&records, config, args.linear, snapshot, &query, hints)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }

        Commands::Stats { index } => {
            let graph =
                KGraph::load(&index).with_context(|| format!("loading graph {:?}", index))?;
            let stats = graph.stats();
            println!("Graph File: {:?}", index);
            println!("  Nodes: {}", stats.nodes);
            println!("  Edges: {}", stats.edges);
            println!(
                "  Degree: min {} / max {} / mean {:.2}",
                stats.min_degree, stats.max_degree, stats.mean_degree
            );
            match persist::read_meta(&index) {
                Ok(count) => println!("  Visible Count (.meta): {}", count),
                Err(err) => println!("  Visible Count (.meta): unavailable ({})", err),
            }
        }
    }

    Ok(())
}
