//! Engine configuration.
//!
//! The lookback and window constants are provider-tuned empirical
//! values; they are kept as named fields with the tuned defaults rather
//! than derived from a formula.

/// Settings for the fetch orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seconds between ticks.
    pub tick_interval_sec: u64,

    /// Per-provider fetch budget within a tick.
    pub fetch_timeout_sec: i64,

    /// How much track history is retained per pilot.
    pub track_retention_sec: i64,

    /// Minimal interval between retained fixes.
    pub simplify_interval_sec: i64,

    /// Latency before a Flymaster fix is available upstream.
    pub flymaster_latency_sec: i64,

    /// Extra lookback before trimming a Flymaster delta.
    pub flymaster_lookback_sec: i64,

    /// Extra lookback before trimming a SkyLines delta.
    pub skylines_lookback_sec: i64,

    /// Seconds between tracker-config refreshes from the account store.
    pub partial_sync_every_sec: i64,

    /// Seconds between full pilot-set reconciles (including removals).
    pub full_sync_every_sec: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_sec: 60,
            fetch_timeout_sec: 40,
            track_retention_sec: 24 * 3600,
            simplify_interval_sec: 30,
            flymaster_latency_sec: 5 * 60,
            flymaster_lookback_sec: 5 * 60,
            skylines_lookback_sec: 10 * 60,
            partial_sync_every_sec: 10 * 60,
            full_sync_every_sec: 24 * 3600,
        }
    }
}

impl EngineConfig {
    /// Sets the tick interval.
    pub fn with_tick_interval_sec(mut self, seconds: u64) -> Self {
        self.tick_interval_sec = seconds;
        self
    }

    /// Sets the per-provider fetch budget.
    pub fn with_fetch_timeout_sec(mut self, seconds: i64) -> Self {
        self.fetch_timeout_sec = seconds;
        self
    }

    /// Sets the retained track duration.
    pub fn with_track_retention_sec(mut self, seconds: i64) -> Self {
        self.track_retention_sec = seconds;
        self
    }
}
