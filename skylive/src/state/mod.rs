//! Fleet state and snapshot distribution.
//!
//! [`FleetState`] is the authoritative in-memory aggregate, mutated only
//! by the fetch orchestrator's tick loop. After every tick the
//! [`SnapshotPublisher`] re-encodes it into full and incremental binary
//! snapshots and swaps them atomically for readers.

mod distributor;
mod fleet;
pub mod proto;

pub use distributor::{
    serve_incremental, DistributorConfig, DistributorError, SnapshotPublisher, SnapshotSet,
};
pub use fleet::{FleetState, Pilot, PilotId, Tracker};
