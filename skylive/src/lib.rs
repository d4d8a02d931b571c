//! Skylive - live-tracking ingestion, fusion and distribution.
//!
//! This library polls third-party live-tracking providers (satellite
//! messengers, GPS-tracking web services), merges the returned position
//! fixes into per-pilot tracks, and republishes compact full and
//! incremental snapshots that many concurrent map clients can poll
//! cheaply.
//!
//! # High-Level API
//!
//! The [`fetcher::FetcherEngine`] drives everything: it runs a periodic
//! tick, fetches every due device from its provider, merges the deltas
//! into the fleet state and hands the result to the
//! [`state::SnapshotPublisher`]:
//!
//! ```ignore
//! use skylive::config::EngineConfig;
//! use skylive::fetcher::{FetcherEngine, SyncCounter};
//! use skylive::provider::RetryingClient;
//! use skylive::state::{DistributorConfig, SnapshotPublisher};
//! use skylive::store::MemoryAccountStore;
//!
//! let publisher = Arc::new(SnapshotPublisher::new(DistributorConfig::default()));
//! let sync = SyncCounter::new();
//! let client = RetryingClient::new()?;
//! let engine = FetcherEngine::new(
//!     EngineConfig::default(), client, store, publisher.clone(), sync.clone(),
//! ).await?;
//! tokio::spawn(engine.run(shutdown_token));
//! ```

pub mod config;
pub mod fetcher;
pub mod logging;
pub mod provider;
pub mod state;
pub mod store;
pub mod time;
pub mod track;

/// Version of the skylive library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
