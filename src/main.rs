//! ==============================================================================
//! main.rs - greenhouse hub entry point
//! ==============================================================================
//!
//! purpose:
//!     collects comma-separated readings pushed by greenhouse sensor nodes
//!     over tcp, keeps the most recent ones in memory and serves a live
//!     summary over http.
//!
//! responsibilities:
//!     - load configuration (hub.toml + command line overrides)
//!     - initialise tracing
//!     - own the shared reading buffer
//!     - start the tcp ingest listener, refresh loop, web server and
//!       (optionally) the simulated node
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                       hub (this file)                         │
//!     │  ┌──────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//!     │  │ tcp ingest   │  │ simulator   │  │ refresh loop         │  │
//!     │  │ (port 12345) │  │ (optional)  │  │ (2s cycle)           │  │
//!     │  └──────┬───────┘  └──────┬──────┘  └──────────┬───────────┘  │
//!     │         │ append          │ push               │ snapshot     │
//!     │         └─────────────────┼────────────────────┘              │
//!     │                     ┌─────┴─────┐                             │
//!     │                     │  buffer   │ <- buffer.rs (last 100)     │
//!     │                     └───────────┘                             │
//!     │                                   watch<Summary>              │
//!     │                     ┌───────────┐ <──────── refresh loop      │
//!     │                     │ web (3000)│                             │
//!     │                     └───────────┘                             │
//!     └──────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

mod buffer;
mod config;
mod domain;
mod ingest;
mod protocol;
mod refresh;
mod simulator;
mod stats;
mod web;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "greenhouse-hub")]
#[command(about = "Greenhouse sensor ingest hub and live dashboard")]
struct Cli {
    /// Path to hub.toml (default: search ./config and ../config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the TCP port sensor nodes push to
    #[arg(long)]
    ingest_port: Option<u16>,

    /// Override the dashboard HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Feed the buffer from a simulated sensor node
    #[arg(long)]
    simulate: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // startup banner
    println!("===========================================================");
    println!("  Greenhouse Hub");
    println!("  TCP sensor ingest + live dashboard");
    println!("===========================================================");

    // step 1: load configuration
    let mut config = match &cli.config {
        Some(path) => config::HubConfig::load(path)?,
        None => config::HubConfig::load_or_default(),
    };
    if let Some(port) = cli.ingest_port {
        config.ingest.port = port;
    }
    if let Some(port) = cli.http_port {
        config.dashboard.port = port;
    }
    if cli.simulate {
        config.simulator.enabled = true;
    }
    config.print_summary();

    init_tracing(&config.logging.level);

    // step 2: shared buffer and summary channel
    let buffer = buffer::SharedBuffer::new(config.buffer.capacity);
    let (summary_tx, summary_rx) = watch::channel(domain::Summary::default());

    // step 3: tcp ingest
    let listener = ingest::bind(config.ingest.addr()?).await?;
    let opts = ingest::IngestOptions {
        max_line_bytes: config.ingest.max_line_bytes,
        show_sensor_data: config.logging.show_sensor_data,
    };
    let ingest_task = tokio::spawn(ingest::serve(listener, buffer.clone(), opts));

    // step 4: optional simulated node
    if config.simulator.enabled {
        tokio::spawn(simulator::run(buffer.clone(), config.simulator.interval()));
    }

    // step 5: periodic reader
    tokio::spawn(refresh::run(
        buffer.clone(),
        config.dashboard.refresh_interval(),
        summary_tx,
        config.logging.show_sensor_data,
    ));

    // step 6: web server
    let web_state = web::WebState {
        buffer: buffer.clone(),
        summary: summary_rx,
        refresh_secs: config.dashboard.refresh_ms.div_ceil(1000),
    };
    let web_addr = config.dashboard.addr()?;
    let web_task = tokio::spawn(web::run_server(web_addr, web_state));

    tokio::select! {
        res = ingest_task => {
            res??;
            tracing::error!("ingest listener stopped");
        }
        res = web_task => {
            res??;
            tracing::error!("web server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            let stats = buffer.stats().await;
            if buffer.is_empty().await {
                tracing::warn!("no readings were buffered during this run");
            }
            let buffered = buffer.len().await;
            let capacity = buffer.capacity().await;
            tracing::info!(
                buffered,
                capacity,
                accepted = stats.accepted,
                rejected = stats.rejected,
                "shutting down"
            );
        }
    }
    Ok(())
}
