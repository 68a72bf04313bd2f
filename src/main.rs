//! Traffic-shadowing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  SHADOW PROXY                     │
//!     Client Request      │  ┌─────────┐    ┌──────────────┐                  │
//!     ────────────────────┼─▶│  http   │───▶│  dispatcher  │──────────────────┼──▶ Production
//!                         │  │ server  │    │ (production) │◀─────────────────┼───
//!     Client Response     │  │         │◀───│              │                  │
//!     ◀───────────────────┼──│         │    └──────┬───────┘                  │
//!                         │  └─────────┘           │ spawn (bounded pool)     │
//!                         │                        ▼                          │
//!                         │  ┌─────────┐    ┌──────────────┐                  │
//!                         │  │ cookie  │◀──▶│  dispatcher  │──────────────────┼──▶ Staging
//!                         │  │  store  │    │  (staging)   │◀─────────────────┼───
//!                         │  └─────────┘    └──────┬───────┘                  │
//!                         │                        ▼                          │
//!                         │                 ┌──────────────┐                  │
//!                         │                 │ exchange sink│──────────────────┼──▶ Collector
//!                         │                 └──────────────┘                  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use shadow_proxy::config::{load_config, ShadowConfig};
use shadow_proxy::lifecycle::{build_dispatcher, signals, Shutdown};
use shadow_proxy::observability::{logging, metrics};
use shadow_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "shadow-proxy")]
#[command(about = "Reverse proxy that replays production traffic against staging", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShadowConfig::default(),
    };

    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("shadow-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        production = %config.production.url,
        staging = %config.staging.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let dispatcher = Arc::new(build_dispatcher(&config).await?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(&config, dispatcher);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
