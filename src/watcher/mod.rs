//! Live reloading of the report cache from filesystem notifications.
//!
//! The `notify` backend thread translates raw events into [`WatchEvent`]s,
//! keeps the ones that can change which report is newest, and forwards them
//! as [`ReloadCommand`]s to a [`ReloadWorker`]. Only the worker touches the
//! cache.
//!
//! Only the results directory itself is watched; subdirectories are not.

pub mod worker;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::reports::{ReportCache, ReportKind};

pub use worker::{ReloadCommand, ReloadWorker};

/// Kind of change a [`WatchEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// A file or directory appeared.
    Created,
    /// Contents or metadata (including mtime) changed.
    Modified,
    /// A file or directory was deleted.
    Removed,
    /// A file or directory was renamed into or out of place.
    Renamed,
    /// Access and unclassified events.
    Other,
}

/// A single filesystem change, as seen by the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path the change applies to.
    pub path: PathBuf,
    /// What happened.
    pub kind: WatchKind,
    /// Whether the path is (or was) a directory.
    pub is_directory: bool,
}

impl WatchEvent {
    /// Split a `notify` event into one [`WatchEvent`] per affected path.
    #[must_use]
    pub fn from_notify(event: &Event) -> Vec<Self> {
        let (kind, folder_hint) = match event.kind {
            EventKind::Create(create) => (WatchKind::Created, create == CreateKind::Folder),
            EventKind::Modify(ModifyKind::Name(_)) => (WatchKind::Renamed, false),
            EventKind::Modify(_) => (WatchKind::Modified, false),
            EventKind::Remove(remove) => (WatchKind::Removed, remove == RemoveKind::Folder),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => (WatchKind::Other, false),
        };

        event
            .paths
            .iter()
            .map(|path| Self {
                path: path.clone(),
                kind,
                is_directory: folder_hint || path.is_dir(),
            })
            .collect()
    }

    /// Whether this event can change the cached reports.
    ///
    /// Directories and access events are ignored. Removals and renames count,
    /// so deleting the newest report falls back to the next one. The suffix
    /// check is case-insensitive, the same as the directory scan.
    #[must_use]
    pub fn triggers_reload(&self) -> bool {
        if self.is_directory {
            return false;
        }
        match self.kind {
            WatchKind::Created | WatchKind::Modified | WatchKind::Removed | WatchKind::Renamed => {
                ReportKind::of_path(&self.path).is_some()
            }
            WatchKind::Other => false,
        }
    }
}

/// Errors that can occur while starting the watcher.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    /// The reload worker thread could not be spawned.
    #[error("Failed to start reload worker: {0}")]
    Spawn(#[from] io::Error),

    /// The notification backend refused the subscription.
    #[error("Cannot watch {path}: {source}")]
    Subscribe {
        /// Directory that was to be watched
        path: PathBuf,
        /// The backend error
        #[source]
        source: notify::Error,
    },
}

/// A running directory subscription plus its reload worker.
///
/// Stopping (explicitly or on drop) unsubscribes first, then tells the
/// worker to exit and joins it.
pub struct DirectoryWatcher {
    watcher: Option<RecommendedWatcher>,
    commands: Sender<ReloadCommand>,
    worker: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Watch the cache's directory (non-recursive) and reload on report changes.
    ///
    /// # Errors
    ///
    /// [`WatchError::Subscribe`] if the directory is missing or the backend
    /// fails, [`WatchError::Spawn`] if the worker thread cannot start. No
    /// thread is left running on error.
    pub fn start(cache: Arc<ReportCache>, debounce: Duration) -> Result<Self, WatchError> {
        let directory = cache.directory().to_path_buf();
        let (commands, worker) = ReloadWorker::spawn(cache, debounce)?;

        let mut this = Self {
            watcher: None,
            commands: commands.clone(),
            worker: Some(worker),
        };

        let subscribe_err = |source: notify::Error| WatchError::Subscribe {
            path: directory.clone(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            forward(res, &commands);
        })
        .map_err(subscribe_err)?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(subscribe_err)?;

        log::info!("Watching {} for report changes", directory.display());
        this.watcher = Some(watcher);
        Ok(this)
    }

    /// Unsubscribe, stop the worker and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the backend closes its event thread and the OS handle.
        drop(self.watcher.take());
        let _ = self.commands.send(ReloadCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Reload worker panicked");
            }
        }
    }
}

impl fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("subscribed", &self.watcher.is_some())
            .field("worker_running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Filter one backend callback and forward matching paths to the worker.
fn forward(res: notify::Result<Event>, commands: &Sender<ReloadCommand>) {
    match res {
        Ok(event) => {
            for change in WatchEvent::from_notify(&event) {
                if change.triggers_reload() {
                    let _ = commands.send(ReloadCommand::Reload(change.path));
                } else {
                    log::trace!("Ignoring {:?} on {}", change.kind, change.path.display());
                }
            }
        }
        Err(e) => log::warn!("Watch error: {e}"),
    }
}

/// Start watching if enabled, logging and continuing without live updates on failure.
#[must_use]
pub fn start_if_enabled(
    enabled: bool,
    cache: &Arc<ReportCache>,
    debounce: Duration,
) -> Option<DirectoryWatcher> {
    if !enabled {
        log::info!("Live reload disabled; reports load once at startup");
        return None;
    }
    match DirectoryWatcher::start(Arc::clone(cache), debounce) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("{e}; continuing without live reload");
            None
        }
    }
}
