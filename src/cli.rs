//! Command-line interface definitions for reportwatch.
//!
//! Every flag is optional; anything left unset falls through to the config
//! file, `REPORTWATCH_*` environment variables and finally built-in defaults
//! (see [`crate::config`]).
//!
//! ```bash
//! # Serve whatever directory the environment resolves to, on $PORT or 5000
//! reportwatch
//!
//! # Serve a fixed directory without live reloading
//! reportwatch --dir ./reports --no-watch
//!
//! # Show the effective configuration
//! reportwatch --port 8080 --print-config
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Serve the newest JSON and text reports from a directory over HTTP.
///
/// The directory is rescanned at startup and, unless --no-watch is given,
/// whenever a .json or .txt file in it changes.
#[derive(Debug, Parser)]
#[command(name = "reportwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Results directory (skips the RESULTS_DIR / platform / fallback lookup)
    #[arg(short, long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Address to bind the HTTP listener on
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Load reports once at startup and never watch the directory
    #[arg(long)]
    pub no_watch: bool,

    /// Quiet period used to coalesce bursts of file events before reloading
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Report startup errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}
