//! Reading report file contents.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading a selected report file.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    /// The file could not be read (deleted mid-reload, permissions, ...).
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that was being read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file is not a valid JSON document.
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        /// File that was being parsed
        path: PathBuf,
        /// The parser error, including line and column
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse a JSON report.
///
/// # Errors
///
/// [`LoadError::Read`] on I/O failure, [`LoadError::Parse`] on malformed
/// JSON or invalid UTF-8.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    let bytes = read(path)?;
    serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a text report, replacing invalid UTF-8 with U+FFFD.
///
/// # Errors
///
/// [`LoadError::Read`] on I/O failure.
pub fn load_text(path: &Path) -> Result<String, LoadError> {
    let bytes = read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::debug!("{} is not valid UTF-8, decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
