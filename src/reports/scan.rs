//! Single-level directory scanning for report files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Errors that can occur while listing the results directory.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when listing the directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The directory does not exist.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ if path.is_file() => Self::NotADirectory(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Report kinds tracked by the cache, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// `*.json`
    Json,
    /// `*.txt`
    Text,
}

impl ReportKind {
    /// All tracked kinds.
    pub const ALL: [ReportKind; 2] = [ReportKind::Json, ReportKind::Text];

    /// Extension including the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => ".json",
            Self::Text => ".txt",
        }
    }

    /// Case-insensitive suffix match on a file name.
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        let ext = self.extension();
        name.len() >= ext.len()
            && name
                .get(name.len() - ext.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
    }

    /// The kind a path belongs to, if any.
    #[must_use]
    pub fn of_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::ALL.into_iter().find(|kind| kind.matches(name))
    }
}

/// A candidate report file and its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Last modification time
    pub modified: SystemTime,
}

/// Newest file of each report kind found by one directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestReports {
    /// Newest `*.json` file
    pub json: Option<ReportFile>,
    /// Newest `*.txt` file
    pub text: Option<ReportFile>,
}

impl LatestReports {
    /// Newest file of `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: ReportKind) -> Option<&ReportFile> {
        match kind {
            ReportKind::Json => self.json.as_ref(),
            ReportKind::Text => self.text.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ReportKind) -> &mut Option<ReportFile> {
        match kind {
            ReportKind::Json => &mut self.json,
            ReportKind::Text => &mut self.text,
        }
    }
}

/// Find the newest regular file of every kind directly inside `dir`.
///
/// The directory is listed once, so both picks come from the same view of
/// it. Ties on modification time go to the entry listed last. Entries whose
/// metadata cannot be read (e.g. deleted mid-scan) are skipped.
///
/// # Errors
///
/// Returns a [`ScanError`] if `dir` itself cannot be listed.
pub fn find_latest_all(dir: &Path) -> Result<LatestReports, ScanError> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;

    let mut latest = LatestReports::default();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let path = entry.path();
        let Some(kind) = ReportKind::of_path(&path) else {
            continue;
        };

        let modified = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => match meta.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    log::debug!("No mtime for {}: {}", path.display(), e);
                    continue;
                }
            },
            Ok(_) => continue,
            Err(e) => {
                log::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let slot = latest.slot_mut(kind);
        if slot.as_ref().map_or(true, |current| modified >= current.modified) {
            *slot = Some(ReportFile { path, modified });
        }
    }

    Ok(latest)
}

/// Find the newest regular file of `kind` directly inside `dir`.
///
/// # Errors
///
/// Returns a [`ScanError`] if `dir` itself cannot be listed.
pub fn find_latest(dir: &Path, kind: ReportKind) -> Result<Option<ReportFile>, ScanError> {
    let latest = find_latest_all(dir)?;
    Ok(match kind {
        ReportKind::Json => latest.json,
        ReportKind::Text => latest.text,
    })
}

/// Names of every entry directly inside `dir`, sorted.
///
/// # Errors
///
/// Returns a [`ScanError`] if `dir` cannot be listed.
pub fn list_names(dir: &Path) -> Result<Vec<String>, ScanError> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}
