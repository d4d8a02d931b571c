//! Published binary message formats.
//!
//! Hand-written prost messages - the schema is small and stable enough
//! that derive attributes beat a codegen step. Field tags are part of
//! the wire contract and must not be renumbered; tracker slots keep
//! their historical tags so readers tolerate retired providers.
//!
//! All messages also derive `Serialize` so the partner export can be
//! re-encoded as JSON on content negotiation.

use std::collections::HashMap;

use serde::Serialize;

use super::fleet::{FleetState, Pilot, Tracker};
use crate::track::{delta_encode, scale_coord, LiveTrack};

/// Compact track: parallel delta-encoded arrays, one entry per fix.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct LiveTrackProto {
    /// Latitude in 1e-5 degrees, delta-encoded.
    #[prost(sint32, repeated, tag = "1")]
    pub lat: Vec<i32>,

    /// Longitude in 1e-5 degrees, delta-encoded.
    #[prost(sint32, repeated, tag = "2")]
    pub lon: Vec<i32>,

    /// Altitude in meters, delta-encoded.
    #[prost(sint32, repeated, tag = "3")]
    pub alt: Vec<i32>,

    /// Epoch seconds, delta-encoded.
    #[prost(sint32, repeated, tag = "4")]
    pub time_sec: Vec<i32>,
}

/// Tracker slot state as published to clients.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TrackerProto {
    #[prost(bool, tag = "1")]
    pub enabled: bool,
    #[prost(string, tag = "2")]
    pub account: String,
    #[prost(int64, tag = "3")]
    pub last_fetch_sec: i64,
    #[prost(int64, tag = "4")]
    pub last_fix_sec: i64,
    #[prost(int64, tag = "5")]
    pub next_fetch_sec: i64,
    #[prost(int64, tag = "6")]
    pub num_errors: i64,
    #[prost(int64, tag = "7")]
    pub num_requests: i64,
    #[prost(int64, tag = "8")]
    pub num_consecutive_errors: i64,
}

/// Pilot state as published to clients.
///
/// Tags 5, 6 and 8 belonged to retired tracker slots and stay reserved.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct PilotProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub track: Option<LiveTrackProto>,
    #[prost(bool, tag = "3")]
    pub share: bool,
    #[prost(bool, tag = "4")]
    pub enabled: bool,
    #[prost(message, optional, tag = "7")]
    pub skylines: Option<TrackerProto>,
    #[prost(message, optional, tag = "9")]
    pub flymaster: Option<TrackerProto>,
}

/// Full engine state: metadata plus every known pilot.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct FetcherStateProto {
    #[prost(int64, tag = "1")]
    pub version: i64,
    #[prost(int64, tag = "2")]
    pub started_sec: i64,
    #[prost(int64, tag = "3")]
    pub re_started_sec: i64,
    #[prost(int64, tag = "4")]
    pub stopped_sec: i64,
    #[prost(int64, tag = "5")]
    pub last_tick_sec: i64,
    #[prost(int64, tag = "6")]
    pub num_ticks: i64,
    #[prost(int64, tag = "7")]
    pub num_starts: i64,
    #[prost(int64, tag = "8")]
    pub last_updated_ms: i64,
    #[prost(int64, tag = "9")]
    pub next_partial_sync_sec: i64,
    #[prost(int64, tag = "10")]
    pub next_full_sync_sec: i64,
    #[prost(int64, tag = "11")]
    pub next_export_sec: i64,
    #[prost(int64, tag = "12")]
    pub mem_rss_mb: i64,
    #[prost(int64, tag = "13")]
    pub mem_heap_mb: i64,
    #[prost(bool, tag = "14")]
    pub in_tick: bool,
    #[prost(map = "int64, message", tag = "15")]
    pub pilots: HashMap<i64, PilotProto>,
}

/// One pilot's track inside a differential group.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct DiffTrackProto {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(sint32, repeated, tag = "3")]
    pub lat: Vec<i32>,
    #[prost(sint32, repeated, tag = "4")]
    pub lon: Vec<i32>,
    #[prost(sint32, repeated, tag = "5")]
    pub alt: Vec<i32>,
    #[prost(sint32, repeated, tag = "6")]
    pub time_sec: Vec<i32>,
}

/// The published artifact: a full or incremental pilot subset plus the
/// boundary timestamp it was computed against.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct DiffTrackGroupProto {
    #[prost(message, repeated, tag = "1")]
    pub tracks: Vec<DiffTrackProto>,

    /// True when only pilots changed since `since_sec` are included.
    #[prost(bool, tag = "2")]
    pub incremental: bool,

    /// Boundary: pilots with changes at or after this time are included.
    #[prost(int64, tag = "3")]
    pub since_sec: i64,
}

/// Parallel delta-encoded arrays for a track.
fn track_columns(track: &LiveTrack) -> (Vec<i32>, Vec<i32>, Vec<i32>, Vec<i32>) {
    let fixes = track.fixes();
    let lat: Vec<i32> = fixes.iter().map(|f| scale_coord(f.lat)).collect();
    let lon: Vec<i32> = fixes.iter().map(|f| scale_coord(f.lon)).collect();
    let alt: Vec<i32> = fixes.iter().map(|f| f.alt.round() as i32).collect();
    let time_sec: Vec<i32> = fixes.iter().map(|f| f.timestamp_sec() as i32).collect();
    (
        delta_encode(&lat),
        delta_encode(&lon),
        delta_encode(&alt),
        delta_encode(&time_sec),
    )
}

impl From<&LiveTrack> for LiveTrackProto {
    fn from(track: &LiveTrack) -> Self {
        let (lat, lon, alt, time_sec) = track_columns(track);
        Self { lat, lon, alt, time_sec }
    }
}

impl From<&Tracker> for TrackerProto {
    fn from(t: &Tracker) -> Self {
        Self {
            enabled: t.enabled,
            account: t.account.clone(),
            last_fetch_sec: t.last_fetch_sec,
            last_fix_sec: t.last_fix_sec,
            next_fetch_sec: t.next_fetch_sec,
            num_errors: t.num_errors,
            num_requests: t.num_requests,
            num_consecutive_errors: t.num_consecutive_errors,
        }
    }
}

impl From<&Pilot> for PilotProto {
    fn from(p: &Pilot) -> Self {
        Self {
            name: p.name.clone(),
            track: (!p.track.is_empty()).then(|| LiveTrackProto::from(&p.track)),
            share: p.share,
            enabled: p.enabled,
            skylines: p.skylines.as_ref().map(TrackerProto::from),
            flymaster: p.flymaster.as_ref().map(TrackerProto::from),
        }
    }
}

impl From<&FleetState> for FetcherStateProto {
    fn from(s: &FleetState) -> Self {
        Self {
            version: s.version,
            started_sec: s.started_sec,
            re_started_sec: s.re_started_sec,
            stopped_sec: s.stopped_sec,
            last_tick_sec: s.last_tick_sec,
            num_ticks: s.num_ticks,
            num_starts: s.num_starts,
            last_updated_ms: s.last_updated_ms,
            next_partial_sync_sec: s.next_partial_sync_sec,
            next_full_sync_sec: s.next_full_sync_sec,
            next_export_sec: s.next_export_sec,
            mem_rss_mb: 0,
            mem_heap_mb: 0,
            in_tick: s.in_tick,
            pilots: s
                .pilots
                .iter()
                .map(|(id, pilot)| (*id, PilotProto::from(pilot)))
                .collect(),
        }
    }
}

/// Builds the differential-group entry for one pilot.
pub fn diff_track(id: i64, name: &str, track: &LiveTrack) -> DiffTrackProto {
    let (lat, lon, alt, time_sec) = track_columns(track);
    DiffTrackProto {
        id,
        name: name.to_string(),
        lat,
        lon,
        alt,
        time_sec,
    }
}
