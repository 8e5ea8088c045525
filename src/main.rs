//! Query frontend binary.
//!
//! ```text
//!     Client query
//!     ───────────────▶ http server ──▶ classify + key ──▶ search | metrics | passthrough
//!                                                              │
//!                                                      caching stage (per role)
//!                                                              │
//!     Client response                                          ▼
//!     ◀─────────────── scrubbed hit  |  querier response ◀── querier
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use query_frontend::config::loader::load_config;
use query_frontend::lifecycle::spawn_signal_handler;
use query_frontend::observability::init_logging;
use query_frontend::{FrontendConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "query-frontend")]
#[command(about = "Caching query frontend for trace search and metrics", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FrontendConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!("query-frontend v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        querier_url = %config.upstream.querier_url,
        request_timeout_secs = config.timeouts.request_secs,
        search_cache = config.cache.search.enabled,
        metrics_cache = config.cache.metrics.enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
