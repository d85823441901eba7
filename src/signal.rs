//! Signal handling for graceful shutdown.
//!
//! A single `ctrlc` hook (SIGINT, SIGTERM and SIGHUP with the `termination`
//! feature) flips a shared flag and wakes every task parked in
//! [`ShutdownHandler::wait`]. The HTTP server uses `wait` as its graceful
//! shutdown future; `run_app` stops the directory watcher once the server has
//! drained.
//!
//! ```rust,no_run
//! use reportwatch::signal::install_handler;
//!
//! # async fn demo() {
//! let handler = install_handler().expect("signal handler");
//! handler.wait().await;
//! // drain, stop the watcher, exit
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

/// Shared shutdown flag plus a wakeup for async waiters.
///
/// Cloning is cheap; every clone observes the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once a signal arrived or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown and wake all waiters.
    ///
    /// Safe to call from the signal thread; it never blocks.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolve once shutdown has been requested.
    ///
    /// Returns immediately if the flag is already set.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent request is not lost.
            notified.as_mut().enable();
            if self.is_shutdown_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Clear the flag. Used by tests that reuse the process-wide handler.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process signal hook and return its handler.
///
/// `ctrlc` only accepts one hook per process, so later calls return the
/// handler registered by the first one (with its flag reset).
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the OS refused the hook and no
/// handler was registered earlier in this process.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let hook = handler.clone();

    match ctrlc::set_handler(move || {
        log::info!("Shutdown signal received, draining requests");
        hook.request_shutdown();
    }) {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(err) => match GLOBAL_HANDLER.get() {
            Some(existing) => {
                existing.reset();
                Ok(existing.clone())
            }
            None => Err(SignalError::InstallFailed(err)),
        },
    }
}
