use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "Concurrent document ingestion: extract, classify, summarize, store")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Worker pool size (default: configured or available parallelism).
    #[arg(
        long,
        global = true,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub concurrency: Option<usize>,

    /// JSON configuration file.
    #[arg(long, global = true, env = "DOCSIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the data directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print the batch result as JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest every recognised file in a folder.
    Folder { path: Option<PathBuf> },
    /// Ingest a single local file.
    File { path: PathBuf },
    /// Ingest a single remote document.
    Url {
        url: String,
        /// Download to the data directory before extracting.
        #[arg(long)]
        download: bool,
    },
    /// Ingest every entry of a JSON manifest of labels to paths or URLs.
    Manifest { path: PathBuf },
    /// Print every stored document record as JSON.
    List {
        /// Newest records first.
        #[arg(long)]
        newest_first: bool,
    },
}
