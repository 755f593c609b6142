//! Timestamp type used throughout the engine.
//!
//! Timestamps are Unix epoch seconds (UTC). The engine never reads the system
//! clock itself; callers pass `now` into every time-dependent operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `secs`, saturating at `u64::MAX`.
    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Whether a window of `duration_secs` starting here has closed at `now`.
    pub fn window_closed(&self, duration_secs: u64, now: Timestamp) -> bool {
        now >= self.saturating_add_secs(duration_secs)
    }

    /// Seconds left in a window of `duration_secs` starting here, 0 once closed.
    pub fn remaining_in_window(&self, duration_secs: u64, now: Timestamp) -> u64 {
        self.saturating_add_secs(duration_secs).0.saturating_sub(now.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_closes_exactly_at_duration() {
        let start = Timestamp::new(1_000);
        assert!(!start.window_closed(60, Timestamp::new(1_059)));
        assert!(start.window_closed(60, Timestamp::new(1_060)));
    }

    #[test]
    fn remaining_in_window_saturates() {
        let start = Timestamp::new(100);
        assert_eq!(start.remaining_in_window(50, Timestamp::new(120)), 30);
        assert_eq!(start.remaining_in_window(50, Timestamp::new(500)), 0);
    }

    #[test]
    fn saturating_add_never_wraps() {
        let t = Timestamp::new(u64::MAX - 1);
        assert_eq!(t.saturating_add_secs(10), Timestamp::new(u64::MAX));
    }
}
