//! CLI configuration with TOML file support.

use keykeeper_utils::{HttpSettings, LogFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the custody daemon and ledger node live, and how to log.
///
/// Can be loaded from a TOML file via [`KeykeeperConfig::from_toml_file`];
/// every field has a default pointing at a local development network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeykeeperConfig {
    /// Base URL of the custody daemon.
    #[serde(default = "default_custody_url")]
    pub custody_url: String,

    /// API token for the custody daemon.
    #[serde(default = "default_dev_token")]
    pub custody_token: String,

    /// Base URL of the ledger node.
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// API token for the ledger node.
    #[serde(default = "default_dev_token")]
    pub ledger_token: String,

    /// Upper bound on one HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_custody_url() -> String {
    "http://localhost:4002".to_string()
}

fn default_ledger_url() -> String {
    "http://localhost:4001".to_string()
}

/// The well-known token of local development networks.
fn default_dev_token() -> String {
    "a".repeat(64)
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl KeykeeperConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings::from_secs(self.request_timeout_secs, self.connect_timeout_secs)
    }
}

impl Default for KeykeeperConfig {
    fn default() -> Self {
        Self {
            custody_url: default_custody_url(),
            custody_token: default_dev_token(),
            ledger_url: default_ledger_url(),
            ledger_token: default_dev_token(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
