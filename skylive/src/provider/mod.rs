//! Live-tracking provider fetchers.
//!
//! One fetcher per external provider, each owning its wire format and
//! temporal reconstruction, all sharing the batch/deadline/error
//! contract of [`TrackerFetcher`] and the backoff policy of
//! [`schedule`]. Fetchers are generic over [`AsyncHttpClient`] so tests
//! run against a scripted [`MockAsyncHttpClient`].

mod factory;
mod flymaster;
mod http;
pub mod polyline;
pub mod schedule;
mod skylines;
mod types;

pub use factory::{build_fetchers, ProviderFetcher};
pub use flymaster::{FlymasterConfig, FlymasterFetcher};
pub use http::{AsyncHttpClient, MockAsyncHttpClient, RetryingClient};
pub use skylines::{SkylinesConfig, SkylinesFetcher};
pub use types::{ProviderError, TrackerFetcher, ValidationError};

/// Provider-specific account format validation, dispatched by id.
///
/// Runs before any network call; an invalid account becomes a per-device
/// error and is skipped, not retried.
pub fn validate_account(
    provider: crate::track::ProviderId,
    account: &str,
) -> Result<u64, ValidationError> {
    match provider {
        crate::track::ProviderId::Flymaster => flymaster::validate_account(account),
        crate::track::ProviderId::Skylines => skylines::validate_account(account),
    }
}
