//! Resync signal between the account-management layer and the engine.
//!
//! The counter is an at-least-once wake-up, not a queue: the API layer
//! increments it after persisting a configuration change, the engine
//! compares the value at tick start and performs one full reconcile on
//! any increase. Coalesced or missed increments are harmless because the
//! reconcile always re-reads the whole store.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Shared monotonically increasing reconfiguration counter.
#[derive(Clone, Debug, Default)]
pub struct SyncCounter {
    value: Arc<AtomicI64>,
}

impl SyncCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals that tracker configuration changed; returns the new value.
    pub fn increment(&self) -> i64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current counter value.
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}
