//! MuyaPro CLI - drive the local services marketplace store from a terminal.
//!
//! Every invocation opens the durable cache, runs one command against the
//! store, and exits. Simulated back-end delays run inside the command.

mod cli;
mod commands;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use muyapro_core::{AppStore, CacheManager, Config, FileStore};

use cli::Cli;

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop and must outlive `main`'s work.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "muyapro.log".to_string());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = Some(dir);
    }
    if cli.seed {
        config.seed_sample_data = true;
    }

    let _guard = init_tracing(config.log_file.as_deref());

    let data_dir = config.data_dir()?;
    let backend = FileStore::new(data_dir.clone())
        .with_context(|| format!("Failed to open data directory: {}", data_dir.display()))?;
    let store = AppStore::open(CacheManager::new(Arc::new(backend)), config.store_options());
    info!(data_dir = %data_dir.display(), "MuyaPro store opened");

    commands::run(cli.command, &store, &config).await
}
