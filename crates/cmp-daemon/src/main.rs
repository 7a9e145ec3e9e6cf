//! CMP Daemon - compute management service
//!
//! `cmpd` exposes tenant quotas, cluster provisioning and instance
//! lifecycle operations over a REST API.

use clap::Parser;
use cmp_daemon::{DaemonConfig, DaemonError, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CMP Daemon CLI
#[derive(Parser)]
#[command(name = "cmpd")]
#[command(about = "CMP Daemon - compute management service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CMP_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "CMP_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level, overrides the configuration file
    #[arg(long, env = "CMP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CMP_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Print startup banner
    println!(
        r#"
   ____ __  __ ____
  / ___|  \/  |  _ \
 | |   | |\/| | |_) |
 | |___| |  | |  __/
  \____|_|  |_|_|

  Compute Management Platform
  Version: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
