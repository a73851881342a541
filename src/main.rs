//! Backend-for-frontend aggregator.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 BFF AGGREGATOR                │
//!   GET /api          │  ┌────────────┐   ┌──────────┐   ┌─────────┐ │
//!   ──────────────────┼─▶│  segment   │──▶│ handlers │──▶│aggregat-│─┼──▶ Backend 1
//!                     │  │ middleware │   │          │   │   or    │ │      (currentDate)
//!                     │  └────────────┘   └──────────┘   │         │─┼──▶ Backend 2
//!   ◀─────────────────┼── {"currentDate","currentTime"}  └─────────┘ │      (currentTime)
//!                     │                                              │
//!                     │  config · logging · metrics · trace emitter  │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use bff_aggregator::config::{load_config, validate_config_or_err, BffConfig};
use bff_aggregator::lifecycle::{self, Shutdown};
use bff_aggregator::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "bff-aggregator")]
#[command(about = "Aggregates two backend services behind one traced endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file. Every setting has a default.
    #[arg(short, long, env = "BFF_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BffConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config_or_err(&config)?;
    }

    init_logging(&config.observability);

    tracing::info!("bff-aggregator v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        service_name = %config.tracing.service_name,
        propagation = ?config.tracing.propagation,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    lifecycle::start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
