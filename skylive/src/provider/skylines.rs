//! SkyLines live-tracking provider.
//!
//! Web-service aggregator: one GET per batch of up to 10 devices at
//! `api/live/{id,id,...}`. Each flight in the response carries
//! polyline-delta-encoded arrays for position, altitude, ground
//! elevation and time-of-day offsets.
//!
//! Time reconstruction is the delicate part: the service reports seconds
//! since midnight UTC of the day the flight *started*, which may be the
//! previous UTC day relative to now. When the flight's start-of-day
//! offset is ahead of the current time-of-day offset, the flight started
//! the day before and every timestamp shifts back accordingly.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use super::http::AsyncHttpClient;
use super::polyline::decode_deltas;
use super::types::{TrackerFetcher, ValidationError};
use crate::fetcher::{Device, TrackerUpdates};
use crate::time::SECONDS_IN_DAY;
use crate::track::{Fix, LiveTrack, ProviderId};

/// Devices per external call.
const MAX_BATCH: usize = 10;

/// Settings for the SkyLines fetcher.
#[derive(Debug, Clone)]
pub struct SkylinesConfig {
    /// Extra lookback kept before trimming a delta track.
    pub lookback_sec: i64,

    /// Bound on how far back fixes are ever requested.
    pub retention_sec: i64,

    /// Minimal interval between retained fixes.
    pub simplify_interval_sec: i64,

    /// Endpoint, overridable for tests.
    pub base_url: String,
}

impl Default for SkylinesConfig {
    fn default() -> Self {
        Self {
            lookback_sec: 10 * 60,
            retention_sec: 24 * 3600,
            simplify_interval_sec: 30,
            base_url: "https://skylines.aero/api/live".to_string(),
        }
    }
}

/// Fetcher for SkyLines users.
pub struct SkylinesFetcher<C> {
    http: C,
    config: SkylinesConfig,
}

impl<C: AsyncHttpClient> SkylinesFetcher<C> {
    pub fn new(http: C, config: SkylinesConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_batch(&self, batch: Vec<Device>, updates: &mut TrackerUpdates) {
        // SkyLines id to (pilot id, keep-from cutoff).
        let mut skl_to_pilot: HashMap<u64, (i64, i64)> = HashMap::new();
        for device in batch {
            match validate_account(&device.account) {
                Ok(skl_id) => {
                    let keep_from_sec = device.fetch_from_sec(
                        updates.start_fetch_sec,
                        self.config.retention_sec,
                        self.config.lookback_sec,
                    );
                    skl_to_pilot.insert(skl_id, (device.pilot_id, keep_from_sec));
                }
                Err(e) => {
                    updates
                        .tracker_errors
                        .insert(device.pilot_id, format!("invalid account {}: {e}", device.account));
                }
            }
        }
        if skl_to_pilot.is_empty() {
            return;
        }

        let mut ids: Vec<u64> = skl_to_pilot.keys().copied().collect();
        ids.sort_unstable();
        let id_list: Vec<String> = ids.iter().map(u64::to_string).collect();
        let url = format!("{}/{}", self.config.base_url, id_list.join(","));

        match self.http.get(&url).await {
            Ok(body) => match serde_json::from_str::<SkylinesResponse>(&body) {
                Ok(response) => {
                    for flight in &response.flights {
                        let Some(&(pilot_id, keep_from_sec)) = skl_to_pilot.get(&flight.sfid)
                        else {
                            continue;
                        };
                        let fixes = parse(flight, updates.start_fetch_sec * 1000);
                        let track = LiveTrack::assemble(fixes)
                            .trim_before(keep_from_sec)
                            .simplify(self.config.simplify_interval_sec);
                        debug!(pilot_id, fixes = track.len(), "skylines delta");
                        updates.track_deltas.insert(pilot_id, track);
                    }
                    for (pilot_id, _) in skl_to_pilot.values() {
                        updates.fetched.insert(*pilot_id);
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

impl<C: AsyncHttpClient> TrackerFetcher for SkylinesFetcher<C> {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Skylines
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

/// Checks the account format: a SkyLines account is the numeric user id
/// from the profile URL.
pub fn validate_account(account: &str) -> Result<u64, ValidationError> {
    let trimmed = account.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("account", "expected a numeric user id"));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| ValidationError::new("account", "user id out of range"))
}

#[derive(Debug, Deserialize)]
struct SkylinesResponse {
    #[serde(default)]
    flights: Vec<SkylinesFlight>,
}

/// One live flight as reported by the service. All arrays are
/// polyline-delta encoded.
#[derive(Debug, Deserialize)]
struct SkylinesFlight {
    /// SkyLines user id.
    sfid: u64,

    /// Interleaved lat/lon pairs, scaled by 1e5.
    #[serde(default)]
    points: String,

    /// Seconds since midnight UTC of the flight's first day.
    #[serde(default)]
    barogram_t: String,

    /// Barometric altitude in meters.
    #[serde(default)]
    barogram_h: String,

    /// Ground elevation in meters.
    #[serde(default)]
    elevations_h: String,

    /// Geoid offset to subtract from altitudes, meters.
    geoid: Option<f64>,
}

/// Decodes a flight into fixes with absolute epoch timestamps.
///
/// `now_ms` anchors the day-rollover detection and is the tick start so
/// reconstruction is deterministic within a tick.
fn parse(flight: &SkylinesFlight, now_ms: i64) -> Vec<Fix> {
    let time = decode_deltas(&flight.barogram_t, 1, 1.0);
    let lonlat = decode_deltas(&flight.points, 2, 1e5);
    let alt = decode_deltas(&flight.barogram_h, 1, 1.0);
    let gnd_alt = decode_deltas(&flight.elevations_h, 1, 1.0);
    if time.is_empty() || lonlat.len() < time.len() * 2 || alt.len() < time.len() {
        return Vec::new();
    }

    let geoid = flight.geoid.unwrap_or(0.0);

    // The first offset is relative to midnight UTC of the day the flight
    // started; decide which day that was.
    let start_seconds = time[0] as i64;
    let start_day_seconds = start_seconds.rem_euclid(SECONDS_IN_DAY);
    let now_seconds = (now_ms + 999) / 1000;
    let now_day_seconds = now_seconds % SECONDS_IN_DAY;
    let started_previous_day = start_day_seconds > now_day_seconds;
    let start_of_current_day_sec = now_seconds - now_day_seconds;
    let start_timestamp_sec = start_of_current_day_sec
        - if started_previous_day { SECONDS_IN_DAY } else { 0 }
        + start_day_seconds;

    time.iter()
        .enumerate()
        .map(|(i, &seconds)| {
            let ts_sec = start_timestamp_sec + seconds as i64 - start_seconds;
            Fix {
                provider: ProviderId::Skylines,
                lat: lonlat[i * 2],
                lon: lonlat[i * 2 + 1],
                alt: alt[i] - geoid,
                gnd_alt: gnd_alt.get(i).copied(),
                speed: None,
                timestamp_ms: ts_sec * 1000,
            }
        })
        .filter(Fix::has_valid_coordinates)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::MockAsyncHttpClient;
    use crate::provider::polyline::encode_deltas;

    /// 2023-11-14T22:13:20Z; 80000 seconds into the UTC day.
    const NOW_SEC: i64 = 1_700_000_000;
    const NOW_DAY_SEC: i64 = 80_000;

    fn flight_json(sfid: u64, day_offsets: &[f64], latlon: &[f64], geoid: Option<f64>) -> String {
        let alts: Vec<f64> = day_offsets.iter().map(|_| 1200.0).collect();
        let mut flight = serde_json::json!({
            "sfid": sfid,
            "points": encode_deltas(latlon, 2, 1e5),
            "barogram_t": encode_deltas(day_offsets, 1, 1.0),
            "barogram_h": encode_deltas(&alts, 1, 1.0),
            "elevations_h": encode_deltas(&alts, 1, 1.0),
        });
        if let Some(g) = geoid {
            flight["geoid"] = serde_json::json!(g);
        }
        serde_json::json!({ "flights": [flight] }).to_string()
    }

    #[test]
    fn validate_account_accepts_numeric_user_id() {
        assert_eq!(validate_account("652"), Ok(652));
        assert!(validate_account("user").is_err());
    }

    #[test]
    fn parse_reconstructs_same_day_timestamps() {
        // Flight started 100 seconds ago.
        let start = NOW_DAY_SEC - 100;
        let flight: SkylinesFlight = serde_json::from_str(
            &flight_json(1, &[start as f64, (start + 60) as f64], &[46.0, 8.0, 46.1, 8.1], None),
        )
        .map(|r: SkylinesResponse| r.flights.into_iter().next().unwrap())
        .unwrap();

        let fixes = parse(&flight, NOW_SEC * 1000);
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].timestamp_sec(), NOW_SEC - 100);
        assert_eq!(fixes[1].timestamp_sec(), NOW_SEC - 40);
        assert!((fixes[0].lat - 46.0).abs() < 1e-5);
        assert!((fixes[1].lon - 8.1).abs() < 1e-5);
    }

    #[test]
    fn parse_detects_day_rollover() {
        // The flight's first offset is later in the day than "now", so it
        // started the previous UTC day.
        let start = NOW_DAY_SEC + 3600;
        let flight: SkylinesFlight = serde_json::from_str(
            &flight_json(1, &[start as f64], &[46.0, 8.0], None),
        )
        .map(|r: SkylinesResponse| r.flights.into_iter().next().unwrap())
        .unwrap();

        let fixes = parse(&flight, NOW_SEC * 1000);
        assert_eq!(fixes.len(), 1);
        let expected = NOW_SEC - NOW_DAY_SEC - SECONDS_IN_DAY + start;
        assert_eq!(fixes[0].timestamp_sec(), expected);
        // Before today's UTC midnight.
        assert!(fixes[0].timestamp_sec() < NOW_SEC - NOW_DAY_SEC);
    }

    #[test]
    fn parse_subtracts_geoid_offset() {
        let start = NOW_DAY_SEC - 10;
        let flight: SkylinesFlight = serde_json::from_str(
            &flight_json(1, &[start as f64], &[46.0, 8.0], Some(48.0)),
        )
        .map(|r: SkylinesResponse| r.flights.into_iter().next().unwrap())
        .unwrap();

        let fixes = parse(&flight, NOW_SEC * 1000);
        assert_eq!(fixes[0].alt, 1200.0 - 48.0);
    }

    #[tokio::test]
    async fn fetch_builds_url_from_batch_ids() {
        let start = NOW_DAY_SEC - 100;
        let mock = MockAsyncHttpClient::new().route(
            "api/live",
            Ok(flight_json(652, &[start as f64], &[46.0, 8.0], None)),
        );
        let fetcher = SkylinesFetcher::new(mock.clone(), SkylinesConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Skylines, NOW_SEC);

        let devices = vec![
            Device { pilot_id: 1, account: "652".into(), last_fix_sec: 0 },
            Device { pilot_id: 2, account: "17".into(), last_fix_sec: 0 },
        ];
        fetcher.fetch(devices, &mut updates, 40).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with("/api/live/17,652"));
        assert!(updates.fetched.contains(&1));
        assert!(updates.fetched.contains(&2));
        assert_eq!(updates.track_deltas.get(&1).unwrap().len(), 1);
        assert!(!updates.track_deltas.contains_key(&2));
    }

    #[tokio::test]
    async fn fetch_trims_at_padded_last_fix() {
        // Device already has fixes up to 15 minutes ago; the delta keeps
        // the 10-minute lookback behind that.
        let last_fix_sec = NOW_SEC - 15 * 60;
        let offsets: Vec<f64> = [
            NOW_DAY_SEC - 40 * 60, // before the padded cutoff, dropped
            NOW_DAY_SEC - 20 * 60, // inside the lookback, kept
            NOW_DAY_SEC - 60,
        ]
        .iter()
        .map(|&s| s as f64)
        .collect();
        let latlon = vec![46.0, 8.0, 46.1, 8.1, 46.2, 8.2];
        let mock = MockAsyncHttpClient::new()
            .route("api/live", Ok(flight_json(652, &offsets, &latlon, None)));
        let fetcher = SkylinesFetcher::new(mock, SkylinesConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Skylines, NOW_SEC);

        let devices = vec![Device { pilot_id: 1, account: "652".into(), last_fix_sec }];
        fetcher.fetch(devices, &mut updates, 40).await;

        let delta = updates.track_deltas.get(&1).unwrap();
        assert_eq!(delta.len(), 2);
        assert_eq!(delta.fixes()[0].timestamp_sec(), NOW_SEC - 20 * 60);
    }

    #[tokio::test]
    async fn unknown_flight_ids_are_ignored() {
        let start = NOW_DAY_SEC - 100;
        let mock = MockAsyncHttpClient::new().route(
            "api/live",
            Ok(flight_json(999, &[start as f64], &[46.0, 8.0], None)),
        );
        let fetcher = SkylinesFetcher::new(mock, SkylinesConfig::default());
        let mut updates = TrackerUpdates::new(ProviderId::Skylines, NOW_SEC);

        let devices = vec![Device { pilot_id: 1, account: "652".into(), last_fix_sec: 0 }];
        fetcher.fetch(devices, &mut updates, 40).await;

        assert!(updates.track_deltas.is_empty());
        assert!(updates.fetched.contains(&1));
    }
}
