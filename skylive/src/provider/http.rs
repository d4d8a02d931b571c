//! HTTP transport for provider calls.
//!
//! Providers are generic over [`AsyncHttpClient`] so tests can inject a
//! [`MockAsyncHttpClient`] instead of hitting the network. The real
//! implementation, [`RetryingClient`], performs GET requests with a
//! bounded retry policy and per-request timeout; provider code never
//! retries on its own.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::types::ProviderError;

/// Trait for asynchronous text-over-HTTP GET operations.
///
/// Both supported providers speak query-string-in / JSON-text-out, so a
/// single `get` capability covers the whole transport surface.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs a GET request and returns the response body as text.
    ///
    /// A non-success status is an error; the transport may retry
    /// internally but the returned future resolves at most once.
    fn get(&self, url: &str) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Real HTTP client: reqwest with bounded retries.
#[derive(Clone)]
pub struct RetryingClient {
    client: reqwest::Client,
    retries: u32,
    retry_delay: Duration,
}

impl RetryingClient {
    /// Default per-request timeout in seconds.
    const DEFAULT_TIMEOUT_SEC: u64 = 10;

    /// Default number of retries after the first attempt.
    const DEFAULT_RETRIES: u32 = 2;

    /// Creates a client with default timeout and retry policy.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT_SEC)
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(timeout_sec: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .user_agent(concat!("skylive/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retries: Self::DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(250),
        })
    }
}

impl AsyncHttpClient for RetryingClient {
    async fn get(&self, url: &str) -> Result<String, ProviderError> {
        let mut last_err = ProviderError::Transport("request not attempted".to_string());
        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(url, status = status.as_u16(), attempt, "HTTP response");
                    if status.is_success() {
                        return response.text().await.map_err(|e| {
                            ProviderError::Transport(format!("failed to read response: {e}"))
                        });
                    }
                    last_err = ProviderError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    };
                    // Client errors are not transient; do not retry them.
                    if status.is_client_error() {
                        return Err(last_err);
                    }
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "HTTP request failed");
                    last_err = ProviderError::Transport(e.to_string());
                }
            }
        }
        Err(last_err)
    }
}

/// Scripted HTTP client for tests.
///
/// Responses are matched by substring against the requested URL, first
/// match wins; every request is recorded so tests can assert on call
/// counts and batch composition.
#[derive(Clone, Default)]
pub struct MockAsyncHttpClient {
    routes: Vec<(String, Result<String, ProviderError>)>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAsyncHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scripted response for URLs containing `needle`.
    pub fn route(mut self, needle: &str, response: Result<String, ProviderError>) -> Self {
        self.routes.push((needle.to_string(), response));
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl AsyncHttpClient for MockAsyncHttpClient {
    async fn get(&self, url: &str) -> Result<String, ProviderError> {
        self.calls.lock().push(url.to_string());
        self.routes
            .iter()
            .find(|(needle, _)| url.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| {
                Err(ProviderError::Transport(format!("no mock route for {url}")))
            })
    }
}
