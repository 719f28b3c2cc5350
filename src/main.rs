//! Redirector (v1)
//!
//! A standalone redirect server built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ─▶ eager routes / app ─▶ 404?
//!                                                          │
//!                                                          ▼
//!                                   dynamic source ─▶ resolver ─▶ route table
//!                                                          │
//!     Client Response                                      ▼
//!     ◀───────────── 3xx + Location, 404 or 500 ◀──────────┘
//!
//!     Admin API (separate listener) ─▶ resolver.register()
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;

use redirector::config::{load_config, RedirectorConfig};
use redirector::lifecycle::{signals::shutdown_on_signal, Shutdown};
use redirector::observability::{logging, metrics};
use redirector::HttpServer;

#[derive(Parser)]
#[command(name = "redirector")]
#[command(about = "HTTP redirect server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "REDIRECTOR_CONFIG", default_value = "redirector.toml")]
    config: PathBuf,
}

fn read_config(path: &Path) -> Result<RedirectorConfig, Box<dyn std::error::Error>> {
    if !path.exists() {
        eprintln!("{} not found, using defaults", path.display());
        return Ok(RedirectorConfig::default());
    }
    Ok(load_config(path)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = read_config(&args.config)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "redirector starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules = config.redirects.routes.len(),
        vhosts = config.redirects.vhosts.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
