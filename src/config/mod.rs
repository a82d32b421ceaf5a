//! Configuration for kgmirror
//!
//! Provides a layered configuration system:
//! - TOML configuration files
//! - Environment variable overrides
//! - Command-line overrides (applied by the binary)
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./kgmirror.toml` - Project-local configuration
//! 2. `~/.config/kgmirror/config.toml` - User configuration (XDG)
//! 3. `~/.kgmirror/config.toml` - User configuration (legacy)
//!
//! # Environment Variables
//!
//! - `KGMIRROR_ENDPOINT` - Remote SPARQL endpoint URL
//! - `KGMIRROR_STORE` - Local store path
//! - `KGMIRROR_JOIN_CHUNK` - Chunk size for join and closure queries
//! - `KGMIRROR_FLAT_CHUNK` - Chunk size for predicate enumeration queries
//! - `KGMIRROR_CHANNEL_CAPACITY` - Ingestion channel capacity (batches)
//! - `KGMIRROR_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//!
//! # Example Configuration
//!
//! ```toml
//! # kgmirror.toml
//!
//! [endpoint]
//! url = "https://query.wikidata.org/sparql"
//! timeout_secs = 300
//! user_agent = "kgmirror/0.1 (ops@example.org)"
//!
//! [store]
//! path = "data/kgmirror.sqlite"
//! isolation = "read_uncommitted"
//! term_cache_capacity = 100000
//!
//! [mirror]
//! join_chunk_size = 1000
//! flat_chunk_size = 10000
//! channel_capacity = 32
//!
//! [general]
//! log_level = "normal"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::{IsolationLevel, DEFAULT_TERM_CACHE_CAPACITY};

/// Default location of the local mirror
pub const DEFAULT_STORE_PATH: &str = "data/kgmirror.sqlite";

/// Default remote endpoint
pub const DEFAULT_ENDPOINT: &str = "https://query.wikidata.org/sparql";

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MirrorConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Remote endpoint settings
    pub endpoint: EndpointConfig,
    /// Local store settings
    pub store: StoreConfig,
    /// Pipeline tuning
    pub mirror: PipelineConfig,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level
    pub log_level: LogLevel,
}

/// Remote SPARQL endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Query endpoint URL
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 300,
            connect_timeout_secs: 10,
            user_agent: format!("kgmirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Local store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file holding the mirror
    pub path: PathBuf,
    /// Isolation level for batch commits
    pub isolation: IsolationLevel,
    /// Bound on the Writer's in-memory term caches
    pub term_cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            isolation: IsolationLevel::ReadUncommitted,
            term_cache_capacity: DEFAULT_TERM_CACHE_CAPACITY,
        }
    }
}

/// Chunking, channel and retry settings for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Identifiers per join / closure query
    pub join_chunk_size: usize,
    /// Identifiers per predicate enumeration query
    pub flat_chunk_size: usize,
    /// Batches the ingestion channel holds before producers wait
    pub channel_capacity: usize,
    /// Commit attempts after the first failure of a batch
    pub write_retries: u32,
    /// Base delay between commit attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            join_chunk_size: 1000,
            flat_chunk_size: 10000,
            channel_capacity: 32,
            write_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "kgmirror=warn",
            LogLevel::Normal => "kgmirror=info",
            LogLevel::Verbose => "kgmirror=debug",
            LogLevel::Debug => "kgmirror=trace,reqwest=debug",
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl MirrorConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from default locations, then apply environment
    /// variable overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Like [`load`](Self::load), but an explicit file replaces the search
    pub fn load_with(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::config_paths().into_iter().find(|p| p.exists()) {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./kgmirror.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("kgmirror").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".kgmirror").join("config.toml"));
        }

        paths
    }

    /// Apply `KGMIRROR_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("KGMIRROR_ENDPOINT") {
            self.endpoint.url = val;
        }

        if let Some(val) = lookup("KGMIRROR_STORE") {
            self.store.path = PathBuf::from(val);
        }

        if let Some(n) = lookup("KGMIRROR_JOIN_CHUNK").and_then(|v| v.parse().ok()) {
            self.mirror.join_chunk_size = n;
        }

        if let Some(n) = lookup("KGMIRROR_FLAT_CHUNK").and_then(|v| v.parse().ok()) {
            self.mirror.flat_chunk_size = n;
        }

        if let Some(n) = lookup("KGMIRROR_CHANNEL_CAPACITY").and_then(|v| v.parse().ok()) {
            self.mirror.channel_capacity = n;
        }

        if let Some(level) = lookup("KGMIRROR_LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)) {
            self.general.log_level = level;
        }
    }

    /// Reject settings a run cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.mirror;
        if self.endpoint.url.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint.url is empty".into()));
        }
        if m.join_chunk_size == 0 || m.flat_chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk sizes must be at least 1".into()));
        }
        if m.flat_chunk_size < m.join_chunk_size {
            return Err(ConfigError::Invalid(format!(
                "flat_chunk_size ({}) is smaller than join_chunk_size ({})",
                m.flat_chunk_size, m.join_chunk_size
            )));
        }
        if m.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error reading {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Parse error in config file
    #[error("parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialize(String),

    /// Values that parse but cannot drive a run
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
