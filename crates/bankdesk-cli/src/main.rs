//! bankdesk - a command-line back-office client for the core banking API.
//!
//! Staff sign in once with `bankdesk login`; later commands reuse the saved
//! access token and renew it transparently through the refresh cookie until
//! the server ends the session.

mod cli;
mod commands;
mod output;

use std::io;
use std::path::Path;

use anyhow::Result;
use bankdesk_core::Config;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Log file written in the cache directory
const LOG_FILE: &str = "bankdesk.log";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=bankdesk_core=debug).
/// The returned guard flushes the file log on drop.
fn init_tracing(cache_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::fs::create_dir_all(cache_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(cache_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
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
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    let cache_dir = config.cache_dir()?;

    let _guard = init_tracing(&cache_dir);
    info!(base_url = %config.base_url, "bankdesk starting");

    let mut ctx = commands::Context::open(config, cache_dir)?;
    commands::run(&mut ctx, cli.command).await
}
