//! Filesmith - line-addressed file mutation service.
//!
//! This is the main entry point for the filesmith CLI. The default mode
//! serves JSON requests over stdio, one request per line.

use anyhow::Context;
use clap::{Parser, Subcommand};
use filesmith_engine::{Engine, EngineConfig};
use filesmith_history::OperationHistory;
use filesmith_server::Service;
use filesmith_util::log::{self, LogConfig, LogLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "filesmith")]
#[command(author, version, about = "Line-addressed file mutation service", long_about = None)]
struct Cli {
    /// Project root against which relative paths resolve
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Directory holding the embedding index sidecar files
    #[arg(long, default_value = "embeddings")]
    embeddings_dir: PathBuf,

    /// Accelerator binary for fast whole-file reads and writes
    #[arg(long)]
    accelerator: Option<PathBuf>,

    /// Embedding manager binary
    #[arg(long)]
    embedding_manager: Option<PathBuf>,

    /// Age in hours after which operation records and backups are swept
    #[arg(long, default_value_t = 24)]
    backup_max_age_hours: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log to this file in addition to stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON requests over stdio (the default)
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    log::init(LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        },
        file: cli.log_file.clone().or_else(log::default_log_path),
        ..LogConfig::default()
    });

    match &cli.command {
        Some(Commands::Serve) | None => serve(&cli).await,
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("project root {} not accessible", cli.root.display()))?;

    let embeddings_dir = if cli.embeddings_dir.is_absolute() {
        cli.embeddings_dir.clone()
    } else {
        root.join(&cli.embeddings_dir)
    };
    tokio::fs::create_dir_all(&embeddings_dir)
        .await
        .with_context(|| format!("creating embeddings directory {}", embeddings_dir.display()))?;

    let config = EngineConfig {
        root: root.clone(),
        embeddings_dir,
        accelerator_bin: cli.accelerator.clone(),
        embedding_bin: cli.embedding_manager.clone(),
        backup_max_age_hours: cli.backup_max_age_hours,
        ..EngineConfig::default()
    };

    info!(root = %root.display(), version = env!("CARGO_PKG_VERSION"), "Starting filesmith");

    let engine = Engine::new(config, Arc::new(OperationHistory::new()));
    let service = Service::new(Arc::new(engine));
    filesmith_server::serve(service).await?;
    Ok(())
}
