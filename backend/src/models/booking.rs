//! Concrete scheduled appointments.
//!
//! A booking occupies a half-open `[start, end)` interval for one provider
//! and one subject. Only `scheduled` and `confirmed` bookings block the
//! calendar; cancelled bookings are kept as history and never hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{BookingId, ProviderId, SubjectId};
use crate::models::interval::TimeInterval;

/// Lifecycle state of a booking.
///
/// `Requested` is the transient state used by self-service flows awaiting
/// provider approval; it does not block the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Requested,
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

/// Statuses that occupy the calendar for conflict purposes.
pub const ACTIVE_STATUSES: [BookingStatus; 2] =
    [BookingStatus::Scheduled, BookingStatus::Confirmed];

impl BookingStatus {
    /// Only these statuses block the calendar.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Scheduled | BookingStatus::Confirmed)
    }

    /// Whether the state machine permits moving from `self` to `to`.
    ///
    /// `Requested -> Scheduled|Confirmed` is approval, `Requested ->
    /// Cancelled` is decline, active states may complete or cancel, and an
    /// active booking may flip between `Scheduled` and `Confirmed`.
    /// `Completed` and `Cancelled` are terminal.
    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        match (self, to) {
            (Requested, Scheduled) | (Requested, Confirmed) | (Requested, Cancelled) => true,
            (Scheduled, Confirmed) | (Confirmed, Scheduled) => true,
            (Scheduled, Completed) | (Confirmed, Completed) => true,
            (Scheduled, Cancelled) | (Confirmed, Cancelled) => true,
            _ => false,
        }
    }

    /// Storage representation (snake_case text column).
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(BookingStatus::Requested),
            "scheduled" => Ok(BookingStatus::Scheduled),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete scheduled appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub provider_id: ProviderId,
    pub subject_id: SubjectId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }

    /// Intervals are `[start, end)`; `end == start` of another booking is no
    /// overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.interval().overlaps(other)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    pub fn duration_minutes(&self) -> i64 {
        self.interval().duration_minutes()
    }
}

impl std::fmt::Display for Booking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ {} -> {} ({})",
            self.subject_id,
            self.start.to_rfc3339(),
            self.end.to_rfc3339(),
            self.status
        )
    }
}

/// Input for creating a booking.
///
/// The initial status is decided by the caller: `Scheduled` for staff
/// flows, `Requested` for self-service flows awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub provider_id: ProviderId,
    pub subject_id: SubjectId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: String,
}

impl NewBooking {
    pub fn new(
        provider_id: ProviderId,
        subject_id: SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_id,
            subject_id,
            start,
            end,
            status: BookingStatus::Scheduled,
            reason: String::new(),
            location: String::new(),
        }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_active_statuses() {
        assert!(BookingStatus::Scheduled.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Requested.is_active());
        assert!(!BookingStatus::Completed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
    }

    #[test]
    fn test_approval_transitions() {
        assert!(BookingStatus::Requested.can_transition_to(BookingStatus::Scheduled));
        assert!(BookingStatus::Requested.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Requested.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Requested.can_transition_to(BookingStatus::Completed));
    }

    #[test]
    fn test_terminal_states() {
        for terminal in [BookingStatus::Completed, BookingStatus::Cancelled] {
            for to in [
                BookingStatus::Requested,
                BookingStatus::Scheduled,
                BookingStatus::Confirmed,
                BookingStatus::Completed,
                BookingStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(to), "{terminal} -> {to}");
            }
        }
    }

    #[test]
    fn test_active_states_complete_and_cancel() {
        assert!(BookingStatus::Scheduled.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Scheduled.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Scheduled));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Requested,
            BookingStatus::Scheduled,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::from_str("pending").is_err());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&BookingStatus::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
    }
}
