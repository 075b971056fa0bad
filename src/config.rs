use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// Time-related constants
// =============================================================================

/// Default scheduled refresh delay in milliseconds (1 hour)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Default validity window of cached outdated-artifact results in minutes
pub const DEFAULT_CACHE_VALIDITY_MINUTES: u64 = 60;

/// Default TTL of an in-memory fetch cache entry in milliseconds (1 hour)
pub const DEFAULT_FETCH_CACHE_TTL_MS: u64 = 60 * 60 * 1000;

/// Connect timeout for registry requests in milliseconds (10 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Overall timeout for registry requests in milliseconds (15 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

// =============================================================================
// Sizing constants
// =============================================================================

/// Default number of concurrent fetch-compare workers
pub const DEFAULT_WORKERS: usize = 10;

/// Default number of entries kept per fetcher cache
pub const DEFAULT_FETCH_CACHE_CAPACITY: usize = 1024;

const APP_DIR_NAME: &str = "kube-app-version";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub outdated_artifacts: OutdatedArtifactsConfig,
    pub fetch_cache: FetchCacheConfig,
    pub http: HttpConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OutdatedArtifactsConfig {
    /// Record every tracked artifact when the process starts
    pub collect_on_startup: bool,
    /// Run a refresh pass when the process starts
    pub refresh_on_startup: bool,
    /// Fixed delay between scheduled refresh passes in milliseconds
    pub interval_ms: u64,
    /// How long cached results stay fresh, and the TTL stamped on each record
    pub cache_validity_minutes: u64,
    pub workers: usize,
}

impl Default for OutdatedArtifactsConfig {
    fn default() -> Self {
        Self {
            collect_on_startup: true,
            refresh_on_startup: true,
            interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            cache_validity_minutes: DEFAULT_CACHE_VALIDITY_MINUTES,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Per-fetcher in-memory cache bounds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchCacheConfig {
    pub capacity: usize,
    pub ttl_ms: u64,
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FETCH_CACHE_CAPACITY,
            ttl_ms: DEFAULT_FETCH_CACHE_TTL_MS,
        }
    }
}

/// HTTP client timeouts
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StoreKind {
    Memory,
    #[default]
    Sqlite,
}

/// Result store backend
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Database file; defaults to [`db_path`]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(db_path)
    }
}

/// Returns the path to the data directory for kube-app-version.
/// Uses $XDG_DATA_HOME/kube-app-version if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/kube-app-version,
/// or ./kube-app-version if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("outdated.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("kube-app-version.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_DIR_NAME)
}
