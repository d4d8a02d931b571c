//! Provider fetcher construction and dispatch.
//!
//! The orchestrator works against one [`ProviderFetcher`] per supported
//! provider. The tagged union keeps dispatch static - fetchers are
//! generic over the HTTP client, so a trait object would erase the
//! client type the tests inject.

use super::flymaster::{FlymasterConfig, FlymasterFetcher};
use super::http::AsyncHttpClient;
use super::skylines::{SkylinesConfig, SkylinesFetcher};
use super::types::TrackerFetcher;
use crate::config::EngineConfig;
use crate::fetcher::{Device, TrackerUpdates};
use crate::state::Tracker;
use crate::track::ProviderId;

/// One concrete provider fetcher, dispatched by [`ProviderId`].
pub enum ProviderFetcher<C: AsyncHttpClient> {
    Flymaster(FlymasterFetcher<C>),
    Skylines(SkylinesFetcher<C>),
}

impl<C: AsyncHttpClient> ProviderFetcher<C> {
    pub fn provider_id(&self) -> ProviderId {
        match self {
            Self::Flymaster(f) => f.provider_id(),
            Self::Skylines(f) => f.provider_id(),
        }
    }

    pub async fn fetch(
        &self,
        devices: Vec<Device>,
        updates: &mut TrackerUpdates,
        timeout_sec: i64,
    ) {
        match self {
            Self::Flymaster(f) => f.fetch(devices, updates, timeout_sec).await,
            Self::Skylines(f) => f.fetch(devices, updates, timeout_sec).await,
        }
    }

    pub fn next_fetch_after_sec(&self, tracker: &Tracker, now_sec: i64) -> i64 {
        match self {
            Self::Flymaster(f) => f.next_fetch_after_sec(tracker, now_sec),
            Self::Skylines(f) => f.next_fetch_after_sec(tracker, now_sec),
        }
    }
}

/// Builds one fetcher per supported provider from the engine settings.
///
/// The client is cloned per fetcher; connection pooling lives inside the
/// client, so clones share the pool.
pub fn build_fetchers<C>(client: C, config: &EngineConfig) -> Vec<ProviderFetcher<C>>
where
    C: AsyncHttpClient + Clone,
{
    ProviderId::ALL
        .iter()
        .map(|provider| match provider {
            ProviderId::Flymaster => ProviderFetcher::Flymaster(FlymasterFetcher::new(
                client.clone(),
                FlymasterConfig {
                    latency_sec: config.flymaster_latency_sec,
                    lookback_sec: config.flymaster_lookback_sec,
                    simplify_interval_sec: config.simplify_interval_sec,
                    ..FlymasterConfig::default()
                },
            )),
            ProviderId::Skylines => ProviderFetcher::Skylines(SkylinesFetcher::new(
                client.clone(),
                SkylinesConfig {
                    lookback_sec: config.skylines_lookback_sec,
                    retention_sec: config.track_retention_sec,
                    simplify_interval_sec: config.simplify_interval_sec,
                    ..SkylinesConfig::default()
                },
            )),
        })
        .collect()
}
