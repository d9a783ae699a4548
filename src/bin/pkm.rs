use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pktmatch_internal::{
    map::{DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY},
    prelude::*,
};

/// Times packet classification with skip list and splay tree rule maps.
#[derive(Parser)]
#[command(version)]
struct Opts {
    /// Dataset preset, acl2 or ipc2.
    #[arg(long, default_value = "acl2")]
    dataset: Dataset,

    /// Directory the preset paths are resolved against.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Rule file to use instead of the preset's.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Header trace to use instead of the preset's, may be repeated.
    #[arg(long)]
    packets: Vec<PathBuf>,

    /// Run only one workload, protocol or five-field.
    #[arg(long)]
    workload: Option<Workload>,

    /// Seed of the skip list leveling, random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Chance of promoting a skip list node one more level.
    #[arg(long, default_value_t = DEFAULT_PROBABILITY)]
    probability: f64,

    /// Level cap of every skip list.
    #[arg(long, default_value_t = DEFAULT_MAX_LEVEL)]
    max_level: usize,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = Opts::parse();
    if !(0.0..=1.0).contains(&opts.probability) {
        bail!("--probability must lie in [0, 1], got {}", opts.probability);
    }
    if opts.max_level == 0 {
        bail!("--max-level must be at least 1");
    }

    let mut config = opts.dataset.config(&opts.data_dir);
    if let Some(rules) = opts.rules {
        config.rules = rules;
    }
    if !opts.packets.is_empty() {
        config.traces = opts.packets.iter().map(TraceSource::from_path).collect();
    }
    if let Some(workload) = opts.workload {
        config.workloads = vec![workload];
    }
    config.map_config = SkipListConfig {
        probability: opts.probability,
        max_level: opts.max_level,
        seed: opts.seed,
    };

    info!(
        rules = %config.rules.display(),
        traces = config.traces.len(),
        "running benchmark"
    );
    let report = run_analysis(&config).context("benchmark failed")?;
    print!("{}", report);
    if !report.agreement() {
        warn!("skip list and splay tree matched different packets");
    }
    Ok(())
}
