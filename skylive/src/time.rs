//! Time helpers.
//!
//! All track timestamps are epoch milliseconds and all scheduling state is
//! epoch seconds; these helpers keep the conversions in one place.

use std::time::{SystemTime, UNIX_EPOCH};

/// Number of seconds in one UTC day.
pub const SECONDS_IN_DAY: i64 = 24 * 3600;

/// Current time as epoch milliseconds.
pub fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Current time as epoch seconds.
pub fn epoch_sec() -> i64 {
    epoch_ms() / 1000
}

/// Seconds elapsed since the previous UTC midnight for the given epoch
/// second.
pub fn day_seconds(epoch_sec: i64) -> i64 {
    epoch_sec.rem_euclid(SECONDS_IN_DAY)
}
