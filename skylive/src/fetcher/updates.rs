//! Per-tick fetch results.
//!
//! A [`TrackerUpdates`] value is created for each provider at tick start,
//! filled by that provider's fetcher, consumed by the orchestrator's
//! merge step and discarded at tick end. Nothing in here outlives a tick.

use std::collections::{HashMap, HashSet};

use crate::state::{FleetState, PilotId};
use crate::track::{LiveTrack, ProviderId};

/// A device due for fetching: the pilot id plus the tracker fields the
/// fetcher needs, copied out of the fleet state so fetchers never touch
/// the live aggregate.
#[derive(Debug, Clone)]
pub struct Device {
    pub pilot_id: PilotId,

    /// Provider-specific account identifier, unvalidated.
    pub account: String,

    /// Timestamp of the most recent fix, 0 when none was ever seen.
    pub last_fix_sec: i64,
}

impl Device {
    /// Earliest timestamp worth requesting or keeping for this device.
    ///
    /// Everything before the last delivered fix is already retained, but
    /// the window is widened by `padding_sec` to absorb fixes delayed by
    /// network-coverage gaps, and never reaches further back than the
    /// retention window.
    pub fn fetch_from_sec(&self, start_fetch_sec: i64, retention_sec: i64, padding_sec: i64) -> i64 {
        let horizon = start_fetch_sec - retention_sec;
        self.last_fix_sec.max(horizon) - padding_sec
    }
}

/// Everything one provider produced during one tick.
#[derive(Debug)]
pub struct TrackerUpdates {
    /// Provider these updates belong to.
    pub provider: ProviderId,

    /// Tick start, epoch seconds; the reference time for latency offsets
    /// and day-rollover reconstruction.
    pub start_fetch_sec: i64,

    /// Delta tracks per successfully parsed device.
    pub track_deltas: HashMap<PilotId, LiveTrack>,

    /// Per-device errors (invalid account, provider-reported failure).
    pub tracker_errors: HashMap<PilotId, String>,

    /// Devices that were successfully contacted, even with no new fixes.
    pub fetched: HashSet<PilotId>,

    /// Tick-level errors not tied to a single device.
    pub errors: Vec<String>,
}

impl TrackerUpdates {
    pub fn new(provider: ProviderId, start_fetch_sec: i64) -> Self {
        Self {
            provider,
            start_fetch_sec,
            track_deltas: HashMap::new(),
            tracker_errors: HashMap::new(),
            fetched: HashSet::new(),
            errors: Vec::new(),
        }
    }
}

/// Selects the devices due for a provider: pilot enabled, tracker slot
/// enabled, and `next_fetch_sec` reached. Sorted by pilot id so batch
/// composition is deterministic.
pub fn due_devices(state: &FleetState, provider: ProviderId, now_sec: i64) -> Vec<Device> {
    let mut devices: Vec<Device> = state
        .pilots
        .iter()
        .filter(|(_, pilot)| pilot.enabled)
        .filter_map(|(id, pilot)| {
            let tracker = pilot.tracker(provider)?;
            (tracker.enabled && tracker.next_fetch_sec <= now_sec).then(|| Device {
                pilot_id: *id,
                account: tracker.account.clone(),
                last_fix_sec: tracker.last_fix_sec,
            })
        })
        .collect();
    devices.sort_by_key(|d| d.pilot_id);
    devices
}
