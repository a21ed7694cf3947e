//! Server configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! whatever the command line (or its `OASF_SDK_*` environment variables)
//! overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:31234";
pub const DEFAULT_SCHEMA_URL: &str = "https://schema.oasf.outshift.com";

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the RPC listener binds to.
    pub listen_address: String,
    /// Base URL of the OASF schema service.
    pub schema_url: String,
    /// Timeout for calls to the schema service.
    pub http_timeout_secs: u64,
    /// Timeout for a whole RPC.
    pub request_timeout_secs: u64,
    /// Directory of `{version}.json` schemas for offline validation.
    pub schema_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            http_timeout_secs: 30,
            request_timeout_secs: 10,
            schema_dir: None,
        }
    }
}

impl Config {
    /// Load a TOML config file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file can't be read and
    /// `ConfigError::Parse` for malformed TOML or unknown keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.schema_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "schema_url must not be empty".to_string(),
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "http_timeout_secs must be >= 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "request_timeout_secs must be >= 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_address
            .parse()
            .map_err(|e| ConfigError::Invalid {
                message: format!("listen_address '{}': {}", self.listen_address, e),
            })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
