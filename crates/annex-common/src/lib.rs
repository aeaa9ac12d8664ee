//! Annex Common - Shared types and configuration
//!
//! This crate provides the attachment payload types (rating aggregates and
//! comments) and the service configuration shared by both Annex services.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigOverrides, ServiceConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
