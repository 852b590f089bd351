use chrono::{DateTime, Utc};
use serde::*;

/// Half-open time interval `[start, end)` in UTC.
///
/// Two intervals that touch exactly at a boundary (one's end equals the
/// other's start) do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create a new interval. Well-formedness (`end > start`) is checked by
    /// callers via [`TimeInterval::is_well_formed`] before any store access.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when the interval spans a positive amount of time.
    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    /// Half-open overlap rule: `self.start < other.end && other.start < self.end`.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whole minutes covered by the interval (negative if inverted).
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
