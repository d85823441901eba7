//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the reportwatch server.
///
/// - 0: Success (server stopped after a shutdown signal)
/// - 1: General error (unexpected failure)
/// - 2: Configuration error (invalid config file, env var or flag)
/// - 3: Bind failure (listen address unavailable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: The server shut down cleanly.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Configuration could not be loaded or was invalid.
    ConfigError = 2,
    /// The HTTP listener could not bind its address.
    BindFailed = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "RW000",
            Self::GeneralError => "RW001",
            Self::ConfigError => "RW002",
            Self::BindFailed => "RW003",
        }
    }
}

/// Startup failures that map onto a specific exit code.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The layered configuration could not be extracted.
    #[error("Invalid configuration: {0}")]
    Config(#[from] figment::Error),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    /// Exit code reported for this failure.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::ConfigError,
            Self::Bind { .. } => ExitCode::BindFailed,
        }
    }
}

/// Pick the exit code for an application error.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<StartupError>()
        .map_or(ExitCode::GeneralError, StartupError::exit_code)
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "RW001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
