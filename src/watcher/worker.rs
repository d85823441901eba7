//! Reload worker: turns watch triggers into cache reloads.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::reports::ReportCache;

/// Messages accepted by the reload worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadCommand {
    /// A report file changed; rescan the directory.
    Reload(PathBuf),
    /// Exit the worker loop.
    Shutdown,
}

/// Outcome of waiting out the debounce window.
#[derive(Debug, PartialEq, Eq)]
enum Window {
    Quiet,
    Stop,
}

/// Owns the receiving end of the command channel and the cache it reloads.
#[derive(Debug)]
pub struct ReloadWorker {
    cache: Arc<ReportCache>,
    commands: Receiver<ReloadCommand>,
    debounce: Duration,
}

impl ReloadWorker {
    /// Start a worker thread and return the channel that drives it.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    pub fn spawn(
        cache: Arc<ReportCache>,
        debounce: Duration,
    ) -> io::Result<(Sender<ReloadCommand>, JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel();
        let worker = Self {
            cache,
            commands: rx,
            debounce,
        };
        let handle = thread::Builder::new()
            .name("report-reload".to_string())
            .spawn(move || worker.run())?;
        Ok((tx, handle))
    }

    fn run(self) {
        log::debug!(
            "Reload worker started for {} (debounce {}ms)",
            self.cache.directory().display(),
            self.debounce.as_millis()
        );

        while let Ok(command) = self.commands.recv() {
            match command {
                ReloadCommand::Shutdown => break,
                ReloadCommand::Reload(path) => {
                    log::debug!("Change detected: {}", path.display());
                    let window = self.coalesce();
                    if window == Window::Stop {
                        break;
                    }
                    self.cache.reload();
                }
            }
        }

        log::debug!("Reload worker stopped");
    }

    /// Swallow further triggers until the debounce window has elapsed.
    ///
    /// The window is fixed from the first trigger, so a file that is written
    /// continuously still gets reloaded once per window.
    fn coalesce(&self) -> Window {
        let deadline = Instant::now() + self.debounce;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Window::Quiet;
            }
            match self.commands.recv_timeout(remaining) {
                Ok(ReloadCommand::Reload(path)) => {
                    log::trace!("Coalescing change: {}", path.display());
                }
                Ok(ReloadCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    return Window::Stop;
                }
                Err(RecvTimeoutError::Timeout) => return Window::Quiet,
            }
        }
    }
}
