//! Timestamps for episodic recency
//!
//! A thin newtype over UTC time, exposed as epoch milliseconds everywhere
//! decay math needs a number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time, carried as UTC and compared by the millisecond
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create from a UTC datetime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now))
    }

    /// Get as a UTC datetime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Get as milliseconds since Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Milliseconds elapsed from this timestamp to `now`
    ///
    /// Negative when `now` is earlier than this timestamp.
    pub fn elapsed_ms(&self, now: Timestamp) -> i64 {
        (now.0 - self.0).num_milliseconds()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        let earlier = Timestamp::from_millis(1_000);
        let later = Timestamp::from_millis(2_000);
        assert!(earlier < later);
    }

    #[test]
    fn test_timestamp_millis_round_trip() {
        let ts = Timestamp::from_millis(1_700_000_000_000);
        assert_eq!(ts.as_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_timestamp_elapsed() {
        let start = Timestamp::from_millis(1_000);
        let end = Timestamp::from_millis(4_500);
        assert_eq!(start.elapsed_ms(end), 3_500);
        assert_eq!(end.elapsed_ms(start), -3_500);
    }

    #[test]
    fn test_timestamp_now_is_recent() {
        let ts = Timestamp::now();
        assert!(ts.as_millis() > 1_600_000_000_000);
    }
}
