//! Provider contract and error types.

use std::future::Future;

use thiserror::Error;

use crate::fetcher::{Device, TrackerUpdates};
use crate::state::Tracker;
use crate::track::ProviderId;

/// Errors from the HTTP transport underneath a provider fetcher.
///
/// Fetchers convert these into tick-level error strings; they never
/// propagate out of a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Non-success HTTP status.
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Connection, timeout or protocol failure.
    #[error("request error: {0}")]
    Transport(String),
}

/// A per-field validation failure, carrying the field identifier so the
/// caller can build a structured validation-error list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Contract implemented once per external provider.
///
/// `fetch` performs however many external calls are required for the
/// given devices and deposits deltas, per-device errors and the
/// fetched-set into `updates`. It must not fail for a single bad device,
/// and once `timeout_sec` is exceeded it records one tick-level timeout
/// error and stops issuing calls; devices left unfetched are retried
/// next tick.
pub trait TrackerFetcher: Send + Sync {
    /// Which tracker slot this fetcher updates.
    fn provider_id(&self) -> ProviderId;

    /// Fetches all devices, batching per the provider's rate limits.
    fn fetch(
        &self,
        devices: Vec<Device>,
        updates: &mut TrackerUpdates,
        timeout_sec: i64,
    ) -> impl Future<Output = ()> + Send;

    /// Seconds until the tracker should be fetched again (see
    /// [`crate::provider::schedule`]).
    fn next_fetch_after_sec(&self, tracker: &Tracker, now_sec: i64) -> i64 {
        super::schedule::next_fetch_after_sec(tracker.last_fix_sec, now_sec)
    }
}
