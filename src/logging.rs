//! Logging setup for the report server.
//!
//! Uses the `log` facade with an `env_logger` backend. The level is chosen by
//! (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (errors only) or `--verbose` (debug/trace)
//! 3. Default: info
//!
//! HTTP and notification internals (`hyper`, `notify`) are capped at `warn`
//! unless `RUST_LOG` asks for them explicitly, so a reload burst or a busy
//! request loop does not drown the report log lines.
//!
//! ```rust,no_run
//! use reportwatch::logging::init_logging;
//!
//! // -v
//! init_logging(1, false);
//! log::debug!("reload worker started");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Crates whose logs are capped at `warn` when no `RUST_LOG` is given.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "notify", "mio"];

/// Initialize the logging subsystem from CLI verbosity flags.
///
/// Must be called once, before the runtime starts.
///
/// # Panics
///
/// Panics if a global logger was already installed.
pub fn init_logging(verbose: u8, quiet: bool) {
    let rust_log = env::var("RUST_LOG").ok();

    let mut builder = Builder::new();
    match &rust_log {
        Some(_) => {
            builder.parse_default_env();
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet));
            for module in NOISY_MODULES {
                builder.filter_module(module, LevelFilter::Warn);
            }
        }
    }

    configure_format(&mut builder, verbose);
    builder.init();

    match rust_log {
        Some(filter) => log::debug!("Logging initialized from RUST_LOG={filter}"),
        None => log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        ),
    }
}

/// Map CLI flags to a level: quiet wins, then 0=info, 1=debug, 2+=trace.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Debug builds get timestamps (and module paths from `-v` up); release
/// builds print level and message only.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}
