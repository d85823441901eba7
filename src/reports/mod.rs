//! In-memory cache of the newest report files.
//!
//! The cache owns one [`ReportSnapshot`] behind an [`ArcSwap`]. A reload
//! builds a complete new snapshot and swaps it in, so readers always see a
//! JSON document and text blob that came from the same scan.
//!
//! # Architecture
//!
//! - [`scan`]: single-level directory listing and newest-file selection
//! - [`load`]: reading and decoding the selected files
//!
//! # Example
//!
//! ```no_run
//! use reportwatch::reports::ReportCache;
//!
//! let cache = ReportCache::new("/srv/reports");
//! cache.reload();
//! if let Some(doc) = cache.json() {
//!     println!("{doc}");
//! }
//! ```

pub mod load;
pub mod scan;

use arc_swap::ArcSwap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use load::{load_json, load_text, LoadError};
pub use scan::{
    find_latest, find_latest_all, list_names, LatestReports, ReportFile, ReportKind, ScanError,
};

/// One reload's worth of report contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSnapshot {
    /// Parsed newest JSON report, if one exists and parsed.
    pub json: Option<Value>,
    /// Newest text report, if one exists and was readable.
    pub text: Option<String>,
    /// File the JSON document was loaded from.
    pub json_source: Option<PathBuf>,
    /// File the text was loaded from.
    pub text_source: Option<PathBuf>,
}

/// Cache of the newest `.json` and `.txt` reports in one directory.
#[derive(Debug)]
pub struct ReportCache {
    directory: PathBuf,
    current: ArcSwap<ReportSnapshot>,
    generation: AtomicU64,
}

impl ReportCache {
    /// Create an empty cache for `directory`. Nothing is read until
    /// [`reload`](Self::reload).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            current: ArcSwap::from_pointee(ReportSnapshot::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Rescan the directory and replace the cached snapshot.
    ///
    /// Never fails: listing errors leave both slots empty, and a file that
    /// cannot be read or parsed leaves only its own slot empty.
    pub fn reload(&self) {
        log::info!("Scanning reports in {}", self.directory.display());

        let LatestReports {
            json: json_file,
            text: text_file,
        } = find_latest_all(&self.directory).unwrap_or_else(|e| {
            log::warn!("Cannot list {}: {}", self.directory.display(), e);
            LatestReports::default()
        });

        let (json, json_source) = match json_file {
            Some(file) => match load_json(&file.path) {
                Ok(doc) => (Some(doc), Some(file.path)),
                Err(e) => {
                    log::error!("{e}");
                    (None, None)
                }
            },
            None => {
                log::info!("No *.json reports in {}", self.directory.display());
                (None, None)
            }
        };

        let (text, text_source) = match text_file {
            Some(file) => match load_text(&file.path) {
                Ok(text) => (Some(text), Some(file.path)),
                Err(e) => {
                    log::error!("{e}");
                    (None, None)
                }
            },
            None => {
                log::info!("No *.txt reports in {}", self.directory.display());
                (None, None)
            }
        };

        let next = ReportSnapshot {
            json,
            text,
            json_source,
            text_source,
        };
        let previous = self.current.swap(Arc::new(next));
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.log_changes(&previous);
    }

    fn log_changes(&self, previous: &ReportSnapshot) {
        let current = self.current.load();
        if current.json_source != previous.json_source {
            if let Some(path) = &current.json_source {
                log::info!("Loaded JSON report: {}", display_name(path));
            }
        }
        if current.text_source != previous.text_source {
            if let Some(path) = &current.text_source {
                log::info!("Loaded text report: {}", display_name(path));
            }
        }
    }

    /// The directory this cache scans.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of completed reloads.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Current snapshot; JSON and text in it come from the same reload.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ReportSnapshot> {
        self.current.load_full()
    }

    /// Newest JSON document, if any.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        self.current.load().json.clone()
    }

    /// Newest text report, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.current.load().text.clone()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
