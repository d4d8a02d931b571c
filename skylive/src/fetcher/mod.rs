//! Fetch orchestration.
//!
//! [`FetcherEngine`] drives the periodic tick; [`TrackerUpdates`] carries
//! one provider's results through a tick; [`SyncCounter`] is the
//! out-of-band resync signal from the account-management layer.

mod engine;
mod sync;
mod updates;

pub use engine::{EngineError, FetcherEngine};
pub use sync::SyncCounter;
pub use updates::{due_devices, Device, TrackerUpdates};
