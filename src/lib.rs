//! reportwatch - serve the newest JSON and text reports from a directory.
//!
//! At startup the results directory is scanned once. With live reload on,
//! a filesystem watcher rescans it whenever a `.json` or `.txt` file changes,
//! while an axum server republishes whatever the cache currently holds.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod reports;
pub mod server;
pub mod signal;
pub mod watcher;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{ExitCode, StartupError};
use crate::reports::ReportCache;
use crate::server::AppState;

/// Run the server to completion.
///
/// Returns once a shutdown signal has been handled, the server has drained
/// and the watcher has been stopped.
///
/// # Errors
///
/// Configuration, signal-hook, runtime or bind failures.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(&cli)?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::Success);
    }

    let resolved = config::resolve_results_dir(config.results_dir.as_deref());
    log::info!(
        "Results directory: {} ({})",
        resolved.path.display(),
        resolved.source
    );

    let shutdown = signal::install_handler()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("reportwatch-http")
        .build()
        .context("Failed to start async runtime")?;

    let cache = Arc::new(ReportCache::new(resolved.path));
    cache.reload();

    let watcher = watcher::start_if_enabled(
        config.watch,
        &cache,
        Duration::from_millis(config.debounce_ms),
    );

    let state = AppState::new(Arc::clone(&cache), config::deployment_id());
    let bind_addr = config.bind_addr();
    let served = runtime.block_on(async {
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| StartupError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        log::info!("Serving reports on http://{bind_addr}");

        let stop = shutdown.clone();
        server::serve(listener, state, async move { stop.wait().await })
            .await
            .context("HTTP server failed")
    });

    if let Some(watcher) = watcher {
        watcher.stop();
    }
    log::info!("Shut down cleanly");

    served.map(|()| ExitCode::Success)
}
