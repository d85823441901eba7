//! Server configuration and results-directory resolution.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. `REPORTWATCH_*` environment variables (e.g. `REPORTWATCH_WATCH=false`)
//! 4. CLI flags
//!
//! The results directory has its own lookup, see [`resolve_results_dir`].

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::StartupError;

/// Prefix for environment overrides of [`Config`] keys.
pub const ENV_PREFIX: &str = "REPORTWATCH_";

/// Primary results-directory variable.
pub const RESULTS_DIR_ENV: &str = "RESULTS_DIR";

/// Secondary results-directory variable, consulted after the platform path.
pub const RESULTS_DIR_CUSTOM_ENV: &str = "RESULTS_DIR_CUSTOM";

/// Data directory of the hosting platform's checkout.
pub const PLATFORM_RESULTS_DIR: &str = "/opt/render/project/src/data";

/// Variable holding the deployed commit, echoed by `/debug/list`.
pub const DEPLOYMENT_ID_ENV: &str = "RENDER_GIT_COMMIT";

/// Placeholder used when [`DEPLOYMENT_ID_ENV`] is unset.
pub const UNKNOWN_DEPLOYMENT: &str = "UNKNOWN";

/// Name of the fallback directory next to the executable.
pub const LOCAL_DATA_DIR: &str = "data";

/// Effective server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the listener binds to.
    pub host: String,
    /// Listener port.
    pub port: u16,
    /// Reload the cache when report files change.
    pub watch: bool,
    /// Quiet period for coalescing file events, in milliseconds.
    pub debounce_ms: u64,
    /// Fixed results directory; bypasses the environment lookup when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            watch: true,
            debounce_ms: 250,
            results_dir: None,
        }
    }
}

impl Config {
    /// Load the layered configuration and apply CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Config`] if the file or environment holds
    /// values of the wrong type.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => Self::default_config_path(),
        };

        let mut config = match path {
            Some(path) => Self::load_from_path(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Self::figment(None)
                .extract::<Config>()
                .map_err(StartupError::from)?,
        };
        config.apply_cli(cli);
        Ok(config)
    }

    /// Load defaults, the given TOML file and environment overrides.
    ///
    /// A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Config`] on malformed TOML or mistyped values.
    pub fn load_from_path(path: &Path) -> Result<Self, StartupError> {
        Ok(Self::figment(Some(path)).extract()?)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Apply flags given on the command line; they win over every other layer.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if cli.no_watch {
            self.watch = false;
        }
        if let Some(ms) = cli.debounce_ms {
            self.debounce_ms = ms;
        }
        if let Some(dir) = &cli.dir {
            self.results_dir = Some(dir.clone());
        }
    }

    /// Socket address string for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Render the configuration as TOML for `--print-config`.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// `config.toml` in the platform-specific configuration directory.
    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "reportwatch", "reportwatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Where the results directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirSource {
    /// `--dir` flag or `results_dir` config key.
    Explicit,
    /// [`RESULTS_DIR_ENV`].
    ResultsDirEnv,
    /// [`PLATFORM_RESULTS_DIR`].
    Platform,
    /// [`RESULTS_DIR_CUSTOM_ENV`].
    CustomDirEnv,
    /// `data/` next to the executable; used even if it does not exist.
    LocalFallback,
}

impl std::fmt::Display for DirSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::ResultsDirEnv => write!(f, "{RESULTS_DIR_ENV}"),
            Self::Platform => write!(f, "platform"),
            Self::CustomDirEnv => write!(f, "{RESULTS_DIR_CUSTOM_ENV}"),
            Self::LocalFallback => write!(f, "local fallback"),
        }
    }
}

/// A resolved results directory and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    /// Directory to scan.
    pub path: PathBuf,
    /// Which lookup step matched.
    pub source: DirSource,
}

/// Resolve the results directory from the process environment.
///
/// Order: `explicit`, `$RESULTS_DIR`, [`PLATFORM_RESULTS_DIR`],
/// `$RESULTS_DIR_CUSTOM`, then `data/` beside the executable. Every step
/// except the first and last is skipped unless it names an existing
/// directory.
#[must_use]
pub fn resolve_results_dir(explicit: Option<&Path>) -> ResolvedDir {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_results_dir_with(
        explicit,
        |name| env::var(name).ok(),
        Path::new(PLATFORM_RESULTS_DIR),
        &exe_dir,
    )
}

/// [`resolve_results_dir`] with injectable environment, platform path and
/// executable directory.
#[must_use]
pub fn resolve_results_dir_with<F>(
    explicit: Option<&Path>,
    lookup: F,
    platform_dir: &Path,
    exe_dir: &Path,
) -> ResolvedDir
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return ResolvedDir {
            path: path.to_path_buf(),
            source: DirSource::Explicit,
        };
    }

    let existing_env_dir = |name: &str| {
        lookup(name)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.is_dir())
    };

    if let Some(path) = existing_env_dir(RESULTS_DIR_ENV) {
        return ResolvedDir {
            path,
            source: DirSource::ResultsDirEnv,
        };
    }
    if platform_dir.is_dir() {
        return ResolvedDir {
            path: platform_dir.to_path_buf(),
            source: DirSource::Platform,
        };
    }
    if let Some(path) = existing_env_dir(RESULTS_DIR_CUSTOM_ENV) {
        return ResolvedDir {
            path,
            source: DirSource::CustomDirEnv,
        };
    }
    ResolvedDir {
        path: exe_dir.join(LOCAL_DATA_DIR),
        source: DirSource::LocalFallback,
    }
}

/// Deployment identifier from [`DEPLOYMENT_ID_ENV`], or [`UNKNOWN_DEPLOYMENT`].
#[must_use]
pub fn deployment_id() -> String {
    deployment_id_with(|name| env::var(name).ok())
}

/// [`deployment_id`] with an injectable environment.
#[must_use]
pub fn deployment_id_with<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(DEPLOYMENT_ID_ENV).unwrap_or_else(|| UNKNOWN_DEPLOYMENT.to_string())
}
