//! Annex Comments - comment threads for named resources
//!
//! Serves `/{type}/{key}/comments` and `/{type}/{key}/comments/{id}` over a
//! local redb store.

use annex_common::{ConfigOverrides, ServiceConfig};
use annex_store::{ResourceNamespace, Store};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "annex-comments")]
#[command(about = "Annex comments service")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/annex/comments.toml")]
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

    let mut config = ServiceConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: {e}");
        ServiceConfig::default()
    });
    args.apply(&mut config);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Annex comments service");
    info!("Config file: {}", config_path);
    config.validate().context("invalid configuration")?;

    let store = Arc::new(
        Store::open(&config.dsn)
            .with_context(|| format!("failed to open store at {}", config.dsn.display()))?,
    );
    ResourceNamespace::new(store.clone())
        .provision(&config.resource_types)
        .with_context(|| format!("failed to provision {:?}", config.resource_types))?;
    info!("Commentable types: {:?}", config.resource_types);

    let app = annex_http::comments_router(store.clone());
    annex_http::serve(app, config.listen_addr()).await?;

    store.close();
    info!("Comments service shut down gracefully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file() {
        let args = Args::parse_from([
            "annex-comments",
            "--dsn",
            "/tmp/comments.redb",
            "--port",
            "9300",
            "--resource-types",
            "posts, videos",
        ]);
        let mut config = ServiceConfig::from_toml("port = 9100\n").unwrap();
        args.apply(&mut config);

        assert_eq!(config.dsn, PathBuf::from("/tmp/comments.redb"));
        assert_eq!(config.port, 9300);
        assert_eq!(config.resource_types, vec!["posts", "videos"]);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_explicit_log_level_beats_file() {
        let args = Args::parse_from(["annex-comments", "--log-level", "info"]);
        let mut config = ServiceConfig::from_toml("[logging]\nlevel = \"debug\"\n").unwrap();
        args.apply(&mut config);
        assert_eq!(config.logging.level, "info");
    }
}
