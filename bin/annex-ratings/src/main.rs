//! Annex Ratings - star ratings for named resources
//!
//! Serves `GET`/`PUT /{type}/{key}/ratings` over a local redb store.

use annex_common::{ConfigOverrides, ServiceConfig};
use annex_store::{ResourceNamespace, Store};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "annex-ratings")]
#[command(about = "Annex ratings service")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/annex/ratings.toml")]
    config: String,

    /// Store file path
    #[arg(long, env = "DSN")]
    dsn: Option<PathBuf>,

    /// HTTP listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Comma separated resource types to serve
    #[arg(long, env = "RESOURCE_TYPES")]
    resource_types: Option<String>,

    /// Log level, overrides `[logging] level` in the config file
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    /// Overlay explicitly given arguments onto the file configuration
    fn apply(self, config: &mut ServiceConfig) {
        ConfigOverrides {
            dsn: self.dsn,
            port: self.port,
            resource_types: self.resource_types,
            log_level: self.log_level,
        }
        .apply(config);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();

    // Load config file if it exists
    let mut config = ServiceConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: {e}");
        ServiceConfig::default()
    });

    // CLI and environment take precedence over the file
    args.apply(&mut config);

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Annex ratings service");
    info!("Config file: {}", config_path);
    config.validate().context("invalid configuration")?;

    let store = Arc::new(
        Store::open(&config.dsn)
            .with_context(|| format!("failed to open store at {}", config.dsn.display()))?,
    );
    ResourceNamespace::new(store.clone())
        .provision(&config.resource_types)
        .with_context(|| format!("failed to provision {:?}", config.resource_types))?;
    info!("Rateable types: {:?}", config.resource_types);

    let app = annex_http::ratings_router(store.clone());
    annex_http::serve(app, config.listen_addr()).await?;

    store.close();
    info!("Ratings service shut down gracefully");

    Ok(())
}
