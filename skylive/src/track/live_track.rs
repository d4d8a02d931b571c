//! Ordered track of position fixes and the pure operations over it.
//!
//! Tracks are immutable values: every operation returns a new track.
//! The fetchers build small delta tracks per tick, the orchestrator
//! merges them into the pilot's retained track, trims the result to the
//! retention window and re-simplifies it.

use super::fix::Fix;

/// A time-ordered sequence of [`Fix`]es for one pilot.
///
/// Invariant: timestamps are non-decreasing. A merged track may contain
/// fixes from several providers; each fix carries its own provider id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveTrack {
    fixes: Vec<Fix>,
}

impl LiveTrack {
    /// Builds a track from unordered fixes, sorting by timestamp.
    pub fn assemble(mut fixes: Vec<Fix>) -> Self {
        fixes.sort_by_key(|f| f.timestamp_ms);
        Self { fixes }
    }

    /// The fixes, oldest first.
    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Most recent fix, if any.
    pub fn last(&self) -> Option<&Fix> {
        self.fixes.last()
    }

    /// Drops every fix strictly earlier than `cutoff_sec`.
    ///
    /// A fix exactly at the cutoff is retained. Used to discard fixes
    /// already delivered in a previous tick while keeping the lookback
    /// margin for late-arriving, out-of-order data.
    pub fn trim_before(&self, cutoff_sec: i64) -> Self {
        let cutoff_ms = cutoff_sec.saturating_mul(1000);
        Self {
            fixes: self
                .fixes
                .iter()
                .filter(|f| f.timestamp_ms >= cutoff_ms)
                .cloned()
                .collect(),
        }
    }

    /// Removes fixes closer together in time than `min_interval_sec`.
    ///
    /// The first and last fix are always preserved. Idempotent:
    /// simplifying an already-simplified track with the same interval
    /// returns an equal track.
    pub fn simplify(&self, min_interval_sec: i64) -> Self {
        if self.fixes.len() <= 2 {
            return self.clone();
        }
        let min_interval_ms = min_interval_sec.saturating_mul(1000);
        let last_index = self.fixes.len() - 1;
        let mut kept = Vec::with_capacity(self.fixes.len());
        kept.push(self.fixes[0].clone());
        let mut last_kept_ms = self.fixes[0].timestamp_ms;
        for fix in &self.fixes[1..last_index] {
            if fix.timestamp_ms - last_kept_ms >= min_interval_ms {
                last_kept_ms = fix.timestamp_ms;
                kept.push(fix.clone());
            }
        }
        kept.push(self.fixes[last_index].clone());
        Self { fixes: kept }
    }

    /// Time-ordered union of two tracks.
    ///
    /// Fixes with identical timestamps are deduplicated; the fix from
    /// `self` wins, so re-fetched overlap windows never duplicate points
    /// already retained.
    pub fn merge(&self, other: &LiveTrack) -> Self {
        let mut fixes = Vec::with_capacity(self.fixes.len() + other.fixes.len());
        let (mut i, mut j) = (0, 0);
        while i < self.fixes.len() && j < other.fixes.len() {
            let (ours, theirs) = (&self.fixes[i], &other.fixes[j]);
            if ours.timestamp_ms <= theirs.timestamp_ms {
                if ours.timestamp_ms == theirs.timestamp_ms {
                    j += 1;
                }
                fixes.push(ours.clone());
                i += 1;
            } else {
                fixes.push(theirs.clone());
                j += 1;
            }
        }
        fixes.extend(self.fixes[i..].iter().cloned());
        fixes.extend(other.fixes[j..].iter().cloned());
        Self { fixes }
    }
}
