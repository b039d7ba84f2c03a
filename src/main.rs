//! techhub-aggregator: one aggregation run for one content kind, printed as JSON.
//!
//! Sources come from `config/sources.toml` (or `SOURCES_CONFIG_PATH`), tag
//! rules from `config/tags.toml` (or `TAGS_CONFIG_PATH`). See `README.md`.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use techhub_aggregator::config::sources::load_sources_default;
use techhub_aggregator::ingest::http::ReqwestFetcher;
use techhub_aggregator::ingest::shuffle::shuffle_records;
use techhub_aggregator::ingest::tags::TagClassifier;
use techhub_aggregator::{Aggregator, AggregatorConfig, ContentKind};

#[derive(Parser, Debug)]
#[command(name = "techhub-aggregator", version, about)]
struct Cli {
    /// Content kind to aggregate (article, job, video)
    kind: String,

    /// Maximum number of records in the output
    #[arg(short, long, default_value_t = 20)]
    limit: usize,

    /// Shuffle the result with this seed (videos are always shuffled)
    #[arg(long)]
    shuffle: Option<u64>,

    /// Dump Prometheus exposition text to stderr after the run
    #[arg(long)]
    metrics: bool,

    /// Already-known dedup keys, one per line
    #[arg(long)]
    existing: Option<std::path::PathBuf>,
}

/// Logs go to stderr so stdout stays pure JSON.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let kind: ContentKind = cli.kind.parse()?;

    let prometheus = if cli.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("install prometheus recorder")?,
        )
    } else {
        None
    };

    let cfg = AggregatorConfig::from_env();
    let registry = load_sources_default()?;
    let classifier = TagClassifier::from_default_location()?;
    let http = ReqwestFetcher::new()?;

    let existing: Vec<String> = match &cli.existing {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read existing keys from {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    let aggregator = Aggregator::new(Arc::new(http), Arc::new(classifier), registry, cfg);
    let mut records = aggregator.aggregate(kind, cli.limit, &existing).await;

    if cli.shuffle.is_some() || kind == ContentKind::Video {
        shuffle_records(&mut records, cli.shuffle);
    }

    println!("{}", serde_json::to_string_pretty(&records)?);

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
