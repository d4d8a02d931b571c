//! Next-fetch backoff policy, shared by every provider.
//!
//! A device with a recent fix is polled once a minute. A device unseen
//! for more than a day is polled on a randomized 3-6 minute interval so
//! a large population of stale devices does not resynchronize into a
//! thundering herd against the provider.

use rand::Rng;

/// Interval for devices with a fix in the last 24 hours.
pub const FRESH_INTERVAL_SEC: i64 = 60;

/// Age beyond which a device is considered stale.
pub const STALE_AFTER_SEC: i64 = 24 * 3600;

/// Seconds until a tracker should be fetched again.
///
/// Pure in its inputs apart from the jitter: stale devices get a whole
/// number of minutes in `[180, 360)`.
pub fn next_fetch_after_sec(last_fix_sec: i64, now_sec: i64) -> i64 {
    if now_sec - last_fix_sec > STALE_AFTER_SEC {
        rand::thread_rng().gen_range(3..6) * 60
    } else {
        FRESH_INTERVAL_SEC
    }
}
