//! Flymaster live-tracking provider.
//!
//! Satellite-relayed tracker: fixes become available with roughly four
//! minutes of latency, so every batch asks for positions starting five
//! minutes before the tick and keeps an extra five-minute lookback
//! before trimming, to absorb fixes delayed by coverage gaps.
//!
//! One GET per batch of up to 10 devices:
//! `getLiveData.php?trackers={"<device id>": <from epoch sec>, ...}`.
//! The response is a JSON object keyed by device id, each value an array
//! of fixes with minute-scaled coordinates.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use super::http::AsyncHttpClient;
use super::types::{TrackerFetcher, ValidationError};
use crate::fetcher::{Device, TrackerUpdates};
use crate::track::{Fix, LiveTrack, ProviderId};

/// Devices per external call, the provider's documented limit.
const MAX_BATCH: usize = 10;

/// Settings for the Flymaster fetcher.
#[derive(Debug, Clone)]
pub struct FlymasterConfig {
    /// Latency before a fix is available upstream (usually ~4 min).
    pub latency_sec: i64,

    /// Extra lookback kept before trimming a delta track.
    pub lookback_sec: i64,

    /// Minimal interval between retained fixes.
    pub simplify_interval_sec: i64,

    /// Endpoint, overridable for tests.
    pub base_url: String,
}

impl Default for FlymasterConfig {
    fn default() -> Self {
        Self {
            latency_sec: 5 * 60,
            lookback_sec: 5 * 60,
            simplify_interval_sec: 30,
            base_url: "https://lt.flymaster.net/wlb/getLiveData.php".to_string(),
        }
    }
}

/// Fetcher for Flymaster devices.
pub struct FlymasterFetcher<C> {
    http: C,
    config: FlymasterConfig,
}

impl<C: AsyncHttpClient> FlymasterFetcher<C> {
    pub fn new(http: C, config: FlymasterConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_batch(&self, batch: Vec<Device>, updates: &mut TrackerUpdates) {
        // Retrieve positions from at least `latency_sec` ago.
        let fetch_sec = updates.start_fetch_sec - self.config.latency_sec;

        // Flymaster id to pilot id.
        let mut flm_to_pilot: HashMap<u64, i64> = HashMap::new();
        let mut trackers_param: HashMap<String, i64> = HashMap::new();
        for device in batch {
            match validate_account(&device.account) {
                Ok(flm_id) => {
                    flm_to_pilot.insert(flm_id, device.pilot_id);
                    trackers_param.insert(flm_id.to_string(), fetch_sec);
                }
                Err(e) => {
                    updates
                        .tracker_errors
                        .insert(device.pilot_id, format!("invalid account {}: {e}", device.account));
                }
            }
        }
        if flm_to_pilot.is_empty() {
            return;
        }

        let param = match serde_json::to_string(&trackers_param) {
            Ok(p) => p,
            Err(e) => {
                updates.errors.push(format!("error encoding request: {e}"));
                return;
            }
        };
        let url = format!("{}?trackers={param}", self.config.base_url);

        match self.http.get(&url).await {
            Ok(body) => match serde_json::from_str::<HashMap<String, Vec<FlymasterFix>>>(&body) {
                Ok(flights) => {
                    for pilot_id in flm_to_pilot.values() {
                        updates.fetched.insert(*pilot_id);
                    }
                    for (flm_id, fixes) in &flights {
                        let Some(pilot_id) =
                            flm_id.parse::<u64>().ok().and_then(|id| flm_to_pilot.get(&id))
                        else {
                            continue;
                        };
                        let track = LiveTrack::assemble(parse(fixes))
                            .trim_before(fetch_sec - self.config.lookback_sec)
                            .simplify(self.config.simplify_interval_sec);
                        debug!(pilot_id = *pilot_id, fixes = track.len(), "flymaster delta");
                        updates.track_deltas.insert(*pilot_id, track);
                    }
                }
                Err(e) => updates
                    .errors
                    .push(format!("error parsing response from {url}: {e}")),
            },
            Err(e) => updates.errors.push(format!("{e}")),
        }
    }
}

impl<C: AsyncHttpClient> TrackerFetcher for FlymasterFetcher<C> {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Flymaster
    }

    async fn fetch(&self, mut devices: Vec<Device>, updates: &mut TrackerUpdates, timeout_sec: i64) {
        let deadline = Instant::now() + Duration::from_secs(timeout_sec.max(0) as u64);

        while !devices.is_empty() {
            let batch: Vec<Device> = devices.drain(..devices.len().min(MAX_BATCH)).collect();
            self.fetch_batch(batch, updates).await;

            if Instant::now() >= deadline && !devices.is_empty() {
                updates.errors.push("fetch timeout".to_string());
                break;
            }
        }
    }
}

/// Checks the account format: a Flymaster account is the numeric device
/// id printed on the tracker.
pub fn validate_account(account: &str) -> Result<u64, ValidationError> {
    let trimmed = account.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(
            "account",
            "expected a numeric device id",
        ));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| ValidationError::new("account", "device id out of range"))
}

/// One fix as reported by the provider: coordinates are scaled by
/// 60000 (minutes of arc times 1000), the timestamp is epoch seconds.
#[derive(Debug, Deserialize)]
struct FlymasterFix {
    /// Latitude * 60000.
    ai: f64,
    /// Longitude * 60000.
    oi: f64,
    /// Altitude in meters.
    #[serde(default)]
    h: f64,
    /// Ground elevation in meters.
    s: Option<f64>,
    /// Speed in km/h.
    v: Option<f64>,
    /// Epoch seconds.
    d: i64,
}

/// Converts provider fixes, dropping samples with non-finite coordinates.
fn parse(fixes: &[FlymasterFix]) -> Vec<Fix> {
    fixes
        .iter()
        .map(|f| Fix {
            provider: ProviderId::Flymaster,
            lat: f.ai / 60_000.0,
            lon: f.oi / 60_000.0,
            alt: f.h,
            gnd_alt: f.s,
            speed: f.v,
            timestamp_ms: f.d * 1000,
        })
        .filter(Fix::has_valid_coordinates)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::MockAsyncHttpClient;

    const NOW_SEC: i64 = 1_700_000_000;

    fn device(pilot_id: i64, account: &str) -> Device {
        Device {
            pilot_id,
            account: account.to_string(),
            last_fix_sec: 0,
        }
    }

    fn flight_json(flm_id: u64, timestamps: &[i64]) -> String {
        let fixes: Vec<String> = timestamps
            .iter()
            .map(|t| format!(r#"{{"ai":2748600,"oi":369600,"h":1500,"s":900,"v":32,"d":{t}}}"#))
            .collect();
        format!(r#"{{"{flm_id}":[{}]}}"#, fixes.join(","))
    }

    #[test]
    fn validate_account_accepts_digits() {
        assert_eq!(validate_account("123456"), Ok(123456));
        assert_eq!(validate_account(" 42 "), Ok(42));
    }

    #[test]
    fn validate_account_rejects_non_numeric() {
        assert!(validate_account("").is_err());
        assert!(validate_account("12a4").is_err());
        assert!(validate_account("-5").is_err());
    }

    #[test]
    fn parse_scales_coordinates() {
        let fixes = vec![FlymasterFix {
            ai: 2_748_600.0,
            oi: 369_600.0,
            h: 1500.0,
            s: Some(900.0),
            v: Some(32.0),
            d: NOW_SEC,
        }];
        let parsed = parse(&fixes);
        assert_eq!(parsed.len(), 1);
        assert!((parsed[0].lat - 45.81).abs() < 1e-9);
        assert!((parsed[0].lon - 6.16).abs() < 1e-9);
        assert_eq!(parsed[0].timestamp_ms, NOW_SEC * 1000);
        assert_eq!(parsed[0].gnd_alt, Some(900.0));
    }

    #[tokio::test]
    async fn fetch_deposits_delta_and_fetched_set() {
        let flm_id = 123456;
        let mock = MockAsyncHttpClient::new().route(
            "getLiveData.php",
            Ok(flight_json(flm_id, &[NOW_SEC - 90, NOW_SEC - 45])),
        );
        let fetcher = FlymasterFetcher::new(mock, FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        fetcher
            .fetch(vec![device(7, "123456")], &mut updates, 40)
            .await;

        assert!(updates.fetched.contains(&7));
        assert!(updates.errors.is_empty());
        let delta = updates.track_deltas.get(&7).expect("delta track");
        assert_eq!(delta.len(), 2);
        assert_eq!(delta.last().unwrap().timestamp_sec(), NOW_SEC - 45);
    }

    #[tokio::test]
    async fn fetch_trims_fixes_older_than_lookback() {
        let flm_id = 123456;
        // One fix well before the lookback window, one inside it.
        let old = NOW_SEC - 3600;
        let recent = NOW_SEC - 60;
        let mock = MockAsyncHttpClient::new()
            .route("getLiveData.php", Ok(flight_json(flm_id, &[old, recent])));
        let fetcher = FlymasterFetcher::new(mock, FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        fetcher
            .fetch(vec![device(7, "123456")], &mut updates, 40)
            .await;

        let delta = updates.track_deltas.get(&7).unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.last().unwrap().timestamp_sec(), recent);
    }

    #[tokio::test]
    async fn invalid_account_is_a_device_error_without_network_call() {
        let mock = MockAsyncHttpClient::new();
        let fetcher = FlymasterFetcher::new(mock.clone(), FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        fetcher
            .fetch(vec![device(7, "not-a-number")], &mut updates, 40)
            .await;

        assert!(updates.tracker_errors.contains_key(&7));
        assert!(!updates.fetched.contains(&7));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn batches_at_most_ten_devices_per_call() {
        let mock = MockAsyncHttpClient::new().route("getLiveData.php", Ok("{}".to_string()));
        let fetcher = FlymasterFetcher::new(mock.clone(), FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        let devices: Vec<Device> = (0..23).map(|i| device(i, &format!("{}", 1000 + i))).collect();
        fetcher.fetch(devices, &mut updates, 40).await;

        // ceil(23 / 10) external calls.
        assert_eq!(mock.calls().len(), 3);
        assert_eq!(updates.fetched.len(), 23);
    }

    #[tokio::test]
    async fn exhausted_deadline_stops_further_batches() {
        let mock = MockAsyncHttpClient::new().route("getLiveData.php", Ok("{}".to_string()));
        let fetcher = FlymasterFetcher::new(mock.clone(), FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        let devices: Vec<Device> = (0..23).map(|i| device(i, &format!("{}", 1000 + i))).collect();
        // Zero budget: the deadline is already exceeded after the first batch.
        fetcher.fetch(devices, &mut updates, 0).await;

        assert_eq!(mock.calls().len(), 1);
        assert_eq!(updates.errors, vec!["fetch timeout".to_string()]);
        // Only the first batch was contacted; the rest are retried next
        // tick, not double-penalized.
        assert_eq!(updates.fetched.len(), 10);
        assert!(updates.tracker_errors.is_empty());
    }

    #[tokio::test]
    async fn http_error_is_a_tick_error_and_devices_stay_unfetched() {
        let mock = MockAsyncHttpClient::new().route(
            "getLiveData.php",
            Err(crate::provider::ProviderError::Status {
                status: 503,
                url: "https://lt.flymaster.net".to_string(),
            }),
        );
        let fetcher = FlymasterFetcher::new(mock, FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        fetcher
            .fetch(vec![device(7, "123456")], &mut updates, 40)
            .await;

        assert_eq!(updates.errors.len(), 1);
        assert!(updates.fetched.is_empty());
        assert!(updates.track_deltas.is_empty());
    }

    #[tokio::test]
    async fn unparsable_body_is_a_tick_error() {
        let mock =
            MockAsyncHttpClient::new().route("getLiveData.php", Ok("not json".to_string()));
        let fetcher = FlymasterFetcher::new(mock, FlymasterConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Flymaster, NOW_SEC);

        fetcher
            .fetch(vec![device(7, "123456")], &mut updates, 40)
            .await;

        assert_eq!(updates.errors.len(), 1);
        assert!(updates.fetched.is_empty());
    }
}
