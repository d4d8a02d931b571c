//! Skylive CLI - runs the fetcher engine.
//!
//! Loads pilot accounts from a JSON file, starts the periodic fetch
//! loop and publishes snapshots until interrupted. The HTTP surface
//! that serves the snapshots to map clients lives in a separate
//! process; this binary only produces them.

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use skylive::config::EngineConfig;
use skylive::fetcher::{FetcherEngine, SyncCounter};
use skylive::logging::init_logging;
use skylive::provider::RetryingClient;
use skylive::state::{DistributorConfig, SnapshotPublisher};
use skylive::store::MemoryAccountStore;

#[derive(Parser)]
#[command(name = "skylive")]
#[command(about = "Live-tracking fetcher engine", long_about = None)]
#[command(version = skylive::VERSION)]
struct Args {
    /// Path to the JSON account file (array of pilot accounts)
    #[arg(long)]
    accounts: String,

    /// Seconds between fetch ticks
    #[arg(long, default_value = "60")]
    tick_interval: u64,

    /// Per-provider fetch budget within a tick, in seconds
    #[arg(long, default_value = "40")]
    fetch_timeout: i64,

    /// Shared secret enabling the partner export
    #[arg(long)]
    partner_token: Option<String>,

    /// Directory for log files (stdout only when omitted)
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match init_logging(args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let accounts_json = match fs::read_to_string(&args.accounts) {
        Ok(contents) => contents,
        Err(e) => {
            error!(path = %args.accounts, error = %e, "cannot read account file");
            return ExitCode::FAILURE;
        }
    };
    let store = match MemoryAccountStore::from_json(&accounts_json) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "cannot parse account file");
            return ExitCode::FAILURE;
        }
    };

    let client = match RetryingClient::new() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "cannot create HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let publisher = Arc::new(SnapshotPublisher::new(DistributorConfig {
        partner_token: args.partner_token,
        ..DistributorConfig::default()
    }));
    let sync = SyncCounter::new();

    let config = EngineConfig::default()
        .with_tick_interval_sec(args.tick_interval)
        .with_fetch_timeout_sec(args.fetch_timeout);

    let engine =
        match FetcherEngine::new(config, client, store, publisher.clone(), sync.clone()).await {
            Ok(engine) => engine,
            Err(e) => {
                error!(error = %e, "engine initialization failed");
                return ExitCode::FAILURE;
            }
        };

    info!(version = skylive::VERSION, "skylive starting");

    let shutdown = CancellationToken::new();
    let engine_task = tokio::spawn(engine.run(shutdown.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    shutdown.cancel();
    let _ = engine_task.await;

    ExitCode::SUCCESS
}
