//! docsift — batch document ingestion from the command line.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use docsift_core::{BatchResult, DocsiftConfig};
use docsift_runtime::{BatchRequest, Pipeline};
use docsift_store::SqliteStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

/// The batch a subcommand asks for; `None` for store-only commands.
fn request_for(cmd: &Command, config: &DocsiftConfig) -> Option<BatchRequest> {
    let request = match cmd {
        Command::Folder { path: Some(path) } => BatchRequest::Folder(path.clone()),
        Command::Folder { path: None } => BatchRequest::default_folder(config),
        Command::File { path } => BatchRequest::File(path.clone()),
        Command::Url { url, download } => BatchRequest::Url {
            url: url.clone(),
            download: *download,
        },
        Command::Manifest { path } => BatchRequest::Manifest(path.clone()),
        Command::List { .. } => return None,
    };
    Some(request)
}

fn print_records(store: &SqliteStore, newest_first: bool) -> anyhow::Result<()> {
    let records: Vec<serde_json::Value> = store
        .get_all_documents(!newest_first)?
        .iter()
        .map(|r| r.to_wire())
        .collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn print_summary(result: &BatchResult, store: &SqliteStore) {
    println!("Batch {}", result.batch_id);
    println!(
        "  {} succeeded, {} failed ({} dispatched) in {:.2}s",
        result.success_count,
        result.failure_count,
        result.dispatched,
        result.elapsed_ms as f64 / 1000.0
    );
    for (category, count) in &result.categories {
        println!("  {:<8} {}", category.as_str(), count);
    }
    if !result.errors.is_empty() {
        println!("  Failures:");
        for (id, failure) in &result.errors {
            println!("    {} [{}] {}", id, failure.kind, failure.reason);
        }
    }
    if let Ok(stats) = store.get_stats() {
        println!(
            "  Store: {} documents ({} processed), {:.2} MB at {}",
            stats.total_documents, stats.committed_documents, stats.db_size_mb, stats.db_path
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = DocsiftConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let paths = config.data_paths();
    paths
        .ensure_dirs()
        .with_context(|| format!("creating data directories under {}", paths.root.display()))?;

    let store = Arc::new(SqliteStore::open(&paths.db).context("opening document store")?);
    info!("Using data directory {}", paths.root.display());

    let Some(request) = request_for(&cli.cmd, &config) else {
        if let Command::List { newest_first } = cli.cmd {
            print_records(&store, newest_first)?;
        }
        return Ok(());
    };
    let pipeline = Pipeline::with_defaults(config, store.clone())?;
    let result = pipeline.run(request, cli.concurrency).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, &store);
    }

    std::process::exit(if result.is_clean() { 0 } else { 1 });
}
