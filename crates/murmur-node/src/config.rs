//! Node configuration: TOML file, then command-line overrides.

use murmur_anti_entropy::AntiEntropyConfig;
use murmur_transport::StdioConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one node process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Milliseconds between anti-entropy rounds
    pub sync_interval_ms: u64,
    /// Milliseconds an outbound sync waits for its reply
    pub rpc_timeout_ms: u64,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 500,
            rpc_timeout_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Parse a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "rpc_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn anti_entropy(&self) -> AntiEntropyConfig {
        AntiEntropyConfig::with_sync_interval(Duration::from_millis(self.sync_interval_ms))
    }

    pub fn stdio(&self) -> StdioConfig {
        StdioConfig {
            rpc_timeout: Duration::from_millis(self.rpc_timeout_ms),
        }
    }
}
