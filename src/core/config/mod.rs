//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The relay is configured once at start-up. The result is a single
//! immutable [`RelayConfig`] that is shared (behind an `Arc`) by the forge,
//! the resolver and the HTTP handlers. Nothing reads configuration from the
//! process environment after start-up.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment (`GITHUB_TOKEN`, `PORT`, `GEOJSON_RELAY_BRANCH`)
//! 4. CLI flags (applied by [`crate::cli`], not here)
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. `--config <FILE>` if given (must exist)
//! 2. `$GEOJSON_RELAY_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/geojson-relay/config.toml`
//! 4. `~/.geojson-relay/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use geojson_relay::core::config::{Config, ProcessEnv};
//!
//! let loaded = Config::load(None, &ProcessEnv).unwrap();
//! let config = loaded.config;
//! println!("branch: {}", config.upstream.branch);
//! println!("mode: {}", config.resolve.mode);
//! ```

pub mod schema;

pub use schema::{DeliveryMode, FileConfig, ResolveSection, ServerSection, UpstreamSection};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::core::credential::Credential;
use crate::core::types::BranchName;

/// Default repository owner.
pub const DEFAULT_OWNER: &str = "wen-zeng";

/// Default repository name.
pub const DEFAULT_REPO: &str = "ChinaTransport";

/// Default branch reference.
pub const DEFAULT_BRANCH: &str = "main";

/// Default contents API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default large-object media base URL.
pub const DEFAULT_MEDIA_BASE: &str = "https://media.githubusercontent.com/media";

/// Default per-call upstream timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound for buffered documents (64 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 64 * 1024 * 1024;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Environment variable holding the bearer credential.
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";

/// Environment variable overriding the listen port.
pub const ENV_PORT: &str = "PORT";

/// Environment variable overriding the branch.
pub const ENV_BRANCH: &str = "GEOJSON_RELAY_BRANCH";

/// Environment variable pointing at a config file.
pub const ENV_CONFIG: &str = "GEOJSON_RELAY_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no credential configured; set {ENV_TOKEN}")]
    MissingCredential,
}

/// Source of environment variables.
///
/// Loading takes the environment as a parameter so tests can supply a map
/// instead of mutating the process environment.
pub trait EnvSource {
    /// Look up a variable; empty values count as unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

/// Upstream repository and transport settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch every lookup resolves against
    pub branch: BranchName,
    /// Contents API base URL
    pub api_base: Url,
    /// Large-object media base URL
    pub media_base: Url,
    /// Bound on each outbound call and on each streamed chunk
    pub timeout: Duration,
    /// Bearer credential
    pub credential: Credential,
}

impl UpstreamConfig {
    /// Upstream settings with every default applied.
    pub fn with_defaults(credential: Credential) -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            repo: DEFAULT_REPO.to_string(),
            branch: BranchName::new(DEFAULT_BRANCH).expect("default branch is valid"),
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is valid"),
            media_base: Url::parse(DEFAULT_MEDIA_BASE).expect("default media base is valid"),
            timeout: DEFAULT_TIMEOUT,
            credential,
        }
    }
}

/// Resolution pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Default delivery mode
    pub mode: DeliveryMode,
    /// Upper bound for a buffered document
    pub max_document_bytes: usize,
    /// Check large-object bytes against the pointer record
    pub verify_large_objects: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::Buffered,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            verify_large_objects: false,
        }
    }
}

/// Fully resolved, immutable relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub resolve: ResolveOptions,
}

impl RelayConfig {
    /// Apply defaults and environment overrides to a parsed file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` when no token is available,
    /// or `ConfigError::InvalidValue` for any value that fails validation.
    pub fn from_file(file: FileConfig, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        file.validate()?;

        let server = file.server.unwrap_or_default();
        let upstream = file.upstream.unwrap_or_default();
        let resolve = file.resolve.unwrap_or_default();

        let port = match env.var(ENV_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ConfigError::InvalidValue(format!("{ENV_PORT} must be a port number, got '{raw}'"))
            })?,
            None => server.port.unwrap_or(DEFAULT_PORT),
        };

        let credential = env
            .var(ENV_TOKEN)
            .ok_or(ConfigError::MissingCredential)
            .and_then(|token| {
                Credential::new(token)
                    .map_err(|e| ConfigError::InvalidValue(format!("{ENV_TOKEN}: {e}")))
            })?;

        let branch = env
            .var(ENV_BRANCH)
            .or(upstream.branch)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let branch = BranchName::new(branch).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let max_document_bytes = match resolve.max_document_bytes {
            Some(bytes) => usize::try_from(bytes).map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "resolve.max_document_bytes {bytes} does not fit in memory"
                ))
            })?,
            None => DEFAULT_MAX_DOCUMENT_BYTES,
        };

        Ok(Self {
            server: ServerConfig {
                bind: server.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
                port,
            },
            upstream: UpstreamConfig {
                owner: upstream.owner.unwrap_or_else(|| DEFAULT_OWNER.to_string()),
                repo: upstream.repo.unwrap_or_else(|| DEFAULT_REPO.to_string()),
                branch,
                api_base: parse_base_url(
                    "upstream.api_base",
                    upstream.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
                )?,
                media_base: parse_base_url(
                    "upstream.media_base",
                    upstream.media_base.as_deref().unwrap_or(DEFAULT_MEDIA_BASE),
                )?,
                timeout: upstream
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_TIMEOUT),
                credential,
            },
            resolve: ResolveOptions {
                mode: resolve.mode.unwrap_or_default(),
                max_document_bytes,
                verify_large_objects: resolve.verify_large_objects.unwrap_or(false),
            },
        })
    }
}

/// Parse a base URL that path segments will be appended to.
pub fn parse_base_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidValue(format!("{field} '{raw}' is not a URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue(format!(
            "{field} '{raw}' must be an http(s) base URL"
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidValue(format!(
            "{field} '{raw}' cannot carry a query or fragment"
        )));
    }
    Ok(url)
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: RelayConfig,
    /// The file it was read from, if any.
    pub loaded_from: Option<PathBuf>,
}

/// Configuration loader.
pub struct Config;

impl Config {
    /// Locate, read and resolve configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, a file exists but
    /// cannot be parsed, or the resolved values are invalid.
    pub fn load(
        explicit: Option<&Path>,
        env: &dyn EnvSource,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let path = Self::locate(explicit, env)?;
        let file = match &path {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };

        Ok(ConfigLoadResult {
            config: RelayConfig::from_file(file, env)?,
            loaded_from: path,
        })
    }

    /// Find the config file to read, if any.
    fn locate(explicit: Option<&Path>, env: &dyn EnvSource) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let candidates = [
            env.var(ENV_CONFIG).map(PathBuf::from),
            env.var("XDG_CONFIG_HOME")
                .map(|xdg| PathBuf::from(xdg).join("geojson-relay/config.toml")),
            dirs::home_dir().map(|home| home.join(".geojson-relay/config.toml")),
        ];

        Ok(candidates.into_iter().flatten().find(|path| path.exists()))
    }

    /// Read and parse a config file.
    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
