//! Error types for Annex configuration

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("at least one resource type must be configured")]
    NoResourceTypes,

    #[error("resource type names cannot be empty")]
    EmptyResourceType,

    #[error("store path cannot be empty")]
    EmptyDsn,
}
