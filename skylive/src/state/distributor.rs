//! Differential snapshot distribution.
//!
//! After every tick the fleet state is re-encoded into four artifacts:
//! a full track group, an incremental track group (only pilots whose
//! track changed within the incremental window), a partner export group
//! and the raw engine-state message. Readers always see a complete set:
//! the publisher swaps an `Arc` to a freshly built [`SnapshotSet`], it
//! never mutates a published one.

use std::sync::Arc;

use parking_lot::RwLock;
use prost::Message;
use thiserror::Error;
use tracing::debug;

use super::fleet::FleetState;
use super::proto::{diff_track, DiffTrackGroupProto, FetcherStateProto};

/// Settings for snapshot building and serving.
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Window covered by the incremental snapshot.
    pub incremental_window_sec: i64,

    /// Slack added to the serving rule to tolerate client/server clock
    /// and polling-interval skew.
    pub incremental_slack_sec: i64,

    /// Shared secret for the partner export; `None` disables it.
    pub partner_token: Option<String>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            incremental_window_sec: 3600,
            incremental_slack_sec: 60,
            partner_token: None,
        }
    }
}

/// Errors surfaced to the polling endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributorError {
    /// Partner token missing or wrong.
    #[error("invalid partner token")]
    InvalidToken,

    /// JSON re-encoding of the export failed.
    #[error("export encoding failed: {0}")]
    Encoding(String),
}

/// One tick's published artifacts, immutable once built.
#[derive(Debug, Clone)]
pub struct SnapshotSet {
    /// Tick this set was built at, epoch seconds.
    pub tick_sec: i64,

    /// Boundary of the incremental group.
    pub incremental_since_sec: i64,

    /// Encoded full track group.
    pub full: Vec<u8>,

    /// Encoded incremental track group.
    pub incremental: Vec<u8>,

    /// Encoded partner export group.
    pub export: Vec<u8>,

    /// Decoded export group, kept for JSON content negotiation.
    pub export_group: DiffTrackGroupProto,

    /// Encoded engine-state message.
    pub state: Vec<u8>,
}

/// Builds the artifact set for a tick.
pub fn build_snapshot_set(state: &FleetState, now_sec: i64, window_sec: i64) -> SnapshotSet {
    let since_sec = now_sec - window_sec;
    let since_ms = since_sec.saturating_mul(1000);

    let mut ids: Vec<i64> = state.pilots.keys().copied().collect();
    ids.sort_unstable();

    let mut full_tracks = Vec::new();
    let mut incremental_tracks = Vec::new();
    let mut export_tracks = Vec::new();
    for id in ids {
        let pilot = &state.pilots[&id];
        if !pilot.enabled || pilot.track.is_empty() {
            continue;
        }
        let track = diff_track(id, &pilot.name, &pilot.track);
        if pilot.last_updated_ms >= since_ms {
            incremental_tracks.push(track.clone());
        }
        if pilot.share {
            export_tracks.push(track.clone());
        }
        full_tracks.push(track);
    }

    let full = DiffTrackGroupProto {
        tracks: full_tracks,
        incremental: false,
        since_sec: 0,
    };
    let incremental = DiffTrackGroupProto {
        tracks: incremental_tracks,
        incremental: true,
        since_sec,
    };
    let export_group = DiffTrackGroupProto {
        tracks: export_tracks,
        incremental: false,
        since_sec: 0,
    };

    SnapshotSet {
        tick_sec: now_sec,
        incremental_since_sec: since_sec,
        full: full.encode_to_vec(),
        incremental: incremental.encode_to_vec(),
        export: export_group.encode_to_vec(),
        export_group,
        state: FetcherStateProto::from(state).encode_to_vec(),
    }
}

/// Serving rule: incremental iff the client's last-seen time is recent
/// enough that the incremental group covers everything it missed.
pub fn serve_incremental(
    last_seen_sec: i64,
    now_sec: i64,
    window_sec: i64,
    slack_sec: i64,
) -> bool {
    last_seen_sec > now_sec - window_sec + slack_sec
}

/// Holds the latest [`SnapshotSet`] and answers poll requests.
///
/// Publication is an atomic pointer swap; a reader that grabbed the
/// previous set keeps a consistent view until it drops the `Arc`.
pub struct SnapshotPublisher {
    config: DistributorConfig,
    current: RwLock<Arc<SnapshotSet>>,
}

impl SnapshotPublisher {
    pub fn new(config: DistributorConfig) -> Self {
        let empty = build_snapshot_set(&FleetState::default(), 0, config.incremental_window_sec);
        Self {
            config,
            current: RwLock::new(Arc::new(empty)),
        }
    }

    /// Rebuilds and swaps the published set from the current state.
    pub fn publish(&self, state: &FleetState, now_sec: i64) {
        let set = build_snapshot_set(state, now_sec, self.config.incremental_window_sec);
        debug!(
            tick_sec = set.tick_sec,
            full_bytes = set.full.len(),
            incremental_bytes = set.incremental.len(),
            "snapshots published"
        );
        *self.current.write() = Arc::new(set);
    }

    /// The latest published set.
    pub fn latest(&self) -> Arc<SnapshotSet> {
        self.current.read().clone()
    }

    /// Anonymous poll: picks full or incremental per the serving rule.
    ///
    /// `last_seen_sec` is the client's last successful poll time; absent
    /// or ancient values get the full snapshot.
    pub fn poll(&self, last_seen_sec: Option<i64>, now_sec: i64) -> Vec<u8> {
        let set = self.latest();
        match last_seen_sec {
            Some(seen)
                if serve_incremental(
                    seen,
                    now_sec,
                    self.config.incremental_window_sec,
                    self.config.incremental_slack_sec,
                ) =>
            {
                set.incremental.clone()
            }
            _ => set.full.clone(),
        }
    }

    /// Authenticated partner poll: the export group, as protobuf bytes
    /// or re-encoded as JSON when the caller negotiates it.
    pub fn export(&self, token: &str, as_json: bool) -> Result<Vec<u8>, DistributorError> {
        match &self.config.partner_token {
            Some(expected) if expected == token => {
                let set = self.latest();
                if as_json {
                    serde_json::to_vec(&set.export_group)
                        .map_err(|e| DistributorError::Encoding(e.to_string()))
                } else {
                    Ok(set.export.clone())
                }
            }
            _ => Err(DistributorError::InvalidToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Pilot, Tracker};
    use crate::track::{Fix, LiveTrack, ProviderId};

    const NOW_SEC: i64 = 1_700_000_000;

    fn track_at(ts_sec: i64) -> LiveTrack {
        LiveTrack::assemble(vec![Fix {
            provider: ProviderId::Flymaster,
            lat: 45.0,
            lon: 6.0,
            alt: 1000.0,
            gnd_alt: None,
            speed: None,
            timestamp_ms: ts_sec * 1000,
        }])
    }

    fn pilot(name: &str, share: bool, updated_sec: i64) -> Pilot {
        Pilot {
            name: name.into(),
            share,
            enabled: true,
            flymaster: Some(Tracker::new(true, "123")),
            track: track_at(updated_sec),
            last_updated_ms: updated_sec * 1000,
            ..Pilot::default()
        }
    }

    fn state_with_pilots() -> FleetState {
        let mut state = FleetState::new(NOW_SEC - 7200);
        // Updated this tick.
        state.pilots.insert(1, pilot("fresh", true, NOW_SEC - 10));
        // Updated outside the incremental window.
        state.pilots.insert(2, pilot("old", false, NOW_SEC - 7000));
        // Disabled pilots never publish.
        let mut hidden = pilot("hidden", true, NOW_SEC);
        hidden.enabled = false;
        state.pilots.insert(3, hidden);
        state
    }

    fn decode(bytes: &[u8]) -> DiffTrackGroupProto {
        DiffTrackGroupProto::decode(bytes).unwrap()
    }

    #[test]
    fn full_group_has_all_enabled_pilots() {
        let set = build_snapshot_set(&state_with_pilots(), NOW_SEC, 3600);
        let full = decode(&set.full);
        let names: Vec<&str> = full.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fresh", "old"]);
        assert!(!full.incremental);
    }

    #[test]
    fn incremental_group_has_only_recent_changes() {
        let set = build_snapshot_set(&state_with_pilots(), NOW_SEC, 3600);
        let incremental = decode(&set.incremental);
        let names: Vec<&str> = incremental.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fresh"]);
        assert!(incremental.incremental);
        assert_eq!(incremental.since_sec, NOW_SEC - 3600);
    }

    #[test]
    fn export_group_has_only_sharing_pilots() {
        let set = build_snapshot_set(&state_with_pilots(), NOW_SEC, 3600);
        let export = decode(&set.export);
        let names: Vec<&str> = export.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fresh"]);
    }

    #[test]
    fn serving_rule_boundary() {
        let window = 3600;
        let slack = 60;
        assert!(serve_incremental(NOW_SEC - window + slack + 1, NOW_SEC, window, slack));
        assert!(!serve_incremental(NOW_SEC - window + slack, NOW_SEC, window, slack));
        assert!(serve_incremental(NOW_SEC - 30, NOW_SEC, window, slack));
        assert!(!serve_incremental(0, NOW_SEC, window, slack));
    }

    #[test]
    fn poll_selects_by_last_seen() {
        let publisher = SnapshotPublisher::new(DistributorConfig::default());
        publisher.publish(&state_with_pilots(), NOW_SEC);

        let recent = publisher.poll(Some(NOW_SEC - 30), NOW_SEC);
        assert!(decode(&recent).incremental);

        let stale = publisher.poll(Some(NOW_SEC - 7200), NOW_SEC);
        assert!(!decode(&stale).incremental);

        let first_poll = publisher.poll(None, NOW_SEC);
        assert!(!decode(&first_poll).incremental);
    }

    #[test]
    fn publish_swaps_atomically() {
        let publisher = SnapshotPublisher::new(DistributorConfig::default());
        let before = publisher.latest();
        publisher.publish(&state_with_pilots(), NOW_SEC);
        let after = publisher.latest();

        // The reader holding the old set still sees a consistent view.
        assert_eq!(before.tick_sec, 0);
        assert_eq!(after.tick_sec, NOW_SEC);
        assert!(decode(&before.full).tracks.is_empty());
        assert_eq!(decode(&after.full).tracks.len(), 2);
    }

    #[test]
    fn export_requires_matching_token() {
        let publisher = SnapshotPublisher::new(DistributorConfig {
            partner_token: Some("sekret".into()),
            ..DistributorConfig::default()
        });
        publisher.publish(&state_with_pilots(), NOW_SEC);

        assert_eq!(
            publisher.export("wrong", false),
            Err(DistributorError::InvalidToken)
        );
        let bytes = publisher.export("sekret", false).unwrap();
        assert_eq!(decode(&bytes).tracks.len(), 1);
    }

    #[test]
    fn export_negotiates_json() {
        let publisher = SnapshotPublisher::new(DistributorConfig {
            partner_token: Some("sekret".into()),
            ..DistributorConfig::default()
        });
        publisher.publish(&state_with_pilots(), NOW_SEC);

        let json = publisher.export("sekret", true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["tracks"][0]["name"], "fresh");
    }

    #[test]
    fn export_disabled_without_configured_token() {
        let publisher = SnapshotPublisher::new(DistributorConfig::default());
        assert_eq!(
            publisher.export("anything", false),
            Err(DistributorError::InvalidToken)
        );
    }
}
