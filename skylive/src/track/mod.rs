//! Point and track model.
//!
//! A [`Fix`] is one immutable GPS sample; a [`LiveTrack`] is a
//! time-ordered sequence of fixes for one pilot. The track operations
//! (assemble, trim, simplify, merge) are pure functions used by the
//! provider fetchers to build per-tick deltas and by the orchestrator to
//! fold deltas into the fleet state.

mod codec;
mod fix;
mod live_track;

pub use codec::{delta_decode, delta_encode, scale_coord, unscale_coord};
pub use fix::{Fix, ProviderId};
pub use live_track::LiveTrack;
