//! Authoritative in-memory fleet state.
//!
//! Single-writer discipline: only the orchestrator's tick loop mutates
//! these structures, after a provider fetch has returned. Readers never
//! see the live state; they read the published snapshots instead.

use std::collections::HashMap;

use crate::track::{LiveTrack, ProviderId};

/// Stable pilot identifier, the external account store's key.
pub type PilotId = i64;

/// Per-pilot, per-provider configuration and fetch state.
///
/// Mutated exactly once per tick by the orchestrator after the fetch for
/// its provider completes, never concurrently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tracker {
    /// Whether this tracker should be fetched at all.
    pub enabled: bool,

    /// Provider-specific account identifier.
    pub account: String,

    /// Last time the tracker was fetched, whether fixes came back or not.
    pub last_fetch_sec: i64,

    /// Timestamp of the most recent fix seen for this tracker.
    pub last_fix_sec: i64,

    /// Next time the tracker is due, per the backoff policy.
    pub next_fetch_sec: i64,

    /// Total errors since the tracker was configured.
    pub num_errors: i64,

    /// Successful fetch attempts.
    pub num_requests: i64,

    /// Errors since the last successful fetch.
    pub num_consecutive_errors: i64,
}

impl Tracker {
    /// A freshly configured tracker, due immediately.
    pub fn new(enabled: bool, account: impl Into<String>) -> Self {
        Self {
            enabled,
            account: account.into(),
            ..Self::default()
        }
    }
}

/// A tracked person: display configuration, one tracker slot per
/// supported provider, and the merged live track.
#[derive(Debug, Clone, Default)]
pub struct Pilot {
    /// Display name.
    pub name: String,

    /// Whether positions may be shared with partners.
    pub share: bool,

    /// Whether the pilot is visible at all.
    pub enabled: bool,

    /// Satellite-style tracker slot.
    pub flymaster: Option<Tracker>,

    /// Web-service tracker slot.
    pub skylines: Option<Tracker>,

    /// Merged track across all of the pilot's providers.
    pub track: LiveTrack,

    /// When the track last changed, epoch milliseconds.
    pub last_updated_ms: i64,
}

impl Pilot {
    /// The tracker slot for a provider, if configured.
    pub fn tracker(&self, provider: ProviderId) -> Option<&Tracker> {
        match provider {
            ProviderId::Flymaster => self.flymaster.as_ref(),
            ProviderId::Skylines => self.skylines.as_ref(),
        }
    }

    /// Mutable access to the tracker slot for a provider.
    pub fn tracker_mut(&mut self, provider: ProviderId) -> Option<&mut Tracker> {
        match provider {
            ProviderId::Flymaster => self.flymaster.as_mut(),
            ProviderId::Skylines => self.skylines.as_mut(),
        }
    }

    /// Replaces the tracker slot for a provider.
    pub fn set_tracker(&mut self, provider: ProviderId, tracker: Option<Tracker>) {
        match provider {
            ProviderId::Flymaster => self.flymaster = tracker,
            ProviderId::Skylines => self.skylines = tracker,
        }
    }
}

/// Root aggregate: snapshot metadata plus the pilot map.
#[derive(Debug, Default)]
pub struct FleetState {
    /// Wire format version of the published snapshots.
    pub version: i64,

    /// First start of this process, epoch seconds.
    pub started_sec: i64,

    /// Most recent (re)start, epoch seconds.
    pub re_started_sec: i64,

    /// Set on graceful shutdown, epoch seconds.
    pub stopped_sec: i64,

    /// Start time of the most recent tick.
    pub last_tick_sec: i64,

    /// Ticks since the last start.
    pub num_ticks: i64,

    /// Number of starts over the process history.
    pub num_starts: i64,

    /// Max `last_updated_ms` over all pilots.
    pub last_updated_ms: i64,

    /// Next tracker-config refresh from the account store.
    pub next_partial_sync_sec: i64,

    /// Next full pilot-set reconcile from the account store.
    pub next_full_sync_sec: i64,

    /// Next partner-export rebuild (exports are rebuilt every tick; this
    /// records the earliest time one is expected).
    pub next_export_sec: i64,

    /// Whether a tick is currently in progress.
    pub in_tick: bool,

    /// All known pilots by id.
    pub pilots: HashMap<PilotId, Pilot>,
}

impl FleetState {
    /// Current snapshot wire version.
    pub const WIRE_VERSION: i64 = 1;

    /// A fresh state for a process starting at `now_sec`.
    pub fn new(now_sec: i64) -> Self {
        Self {
            version: Self::WIRE_VERSION,
            started_sec: now_sec,
            re_started_sec: now_sec,
            num_starts: 1,
            ..Self::default()
        }
    }
}
