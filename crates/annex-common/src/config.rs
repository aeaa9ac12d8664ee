//! Configuration types for Annex services
//!
//! Both services read the same layout from an optional TOML file; command
//! line arguments and environment variables are layered on top by the
//! binaries.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Resource types provisioned when nothing else is configured
pub const DEFAULT_RESOURCE_TYPES: &[&str] = &["authors", "books"];

/// Configuration for one Annex service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Store file location
    #[serde(default = "default_dsn")]
    pub dsn: PathBuf,
    /// HTTP listen port (binds all interfaces)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Top-level containers provisioned at startup
    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            port: default_port(),
            resource_types: default_resource_types(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML document
    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Socket address the HTTP server binds to
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Check the settings that would otherwise fail late, at provisioning time
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dsn.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDsn);
        }
        if self.resource_types.is_empty() {
            return Err(ConfigError::NoResourceTypes);
        }
        if self.resource_types.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyResourceType);
        }
        Ok(())
    }
}

/// Settings given on the command line or in the environment. Every field
/// that is set replaces the value loaded from the config file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dsn: Option<PathBuf>,
    pub port: Option<u16>,
    /// Comma separated, see [`parse_resource_types`]
    pub resource_types: Option<String>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Layer these settings over `config`
    pub fn apply(self, config: &mut ServiceConfig) {
        if let Some(dsn) = self.dsn {
            config.dsn = dsn;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(types) = self.resource_types.as_deref() {
            config.resource_types = parse_resource_types(types);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Split a comma separated list of resource types, dropping blanks
#[must_use]
pub fn parse_resource_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_dsn() -> PathBuf {
    PathBuf::from("./annex.redb")
}

const fn default_port() -> u16 {
    8080
}

fn default_resource_types() -> Vec<String> {
    DEFAULT_RESOURCE_TYPES.iter().map(|s| (*s).to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}
