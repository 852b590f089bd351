//! Conflict checking against active bookings.
//!
//! A candidate interval conflicts with a booking when the booking is active
//! (scheduled or confirmed), belongs to the same provider OR the same
//! subject, and the intervals overlap under the half-open rule. The
//! predicate here is the single source of truth: the in-memory repository
//! filters with it directly and the Postgres repository encodes the same
//! condition in SQL.

use serde::{Deserialize, Serialize};

use super::error::{SchedulingError, SchedulingResult};
use crate::api::{BookingId, ProviderId, SubjectId};
use crate::db::repository::{BookingRepository, FullRepository};
use crate::models::{Booking, TimeInterval};

/// Parameters of a conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictQuery {
    pub provider_id: ProviderId,
    /// When present, the subject's own bookings also count as conflicts,
    /// even with a different provider (a subject cannot be double-booked).
    pub subject_id: Option<SubjectId>,
    pub interval: TimeInterval,
    /// Booking to ignore, used when rechecking a reschedule of an existing
    /// booking against everything else.
    pub exclude: Option<BookingId>,
}

impl ConflictQuery {
    pub fn new(provider_id: ProviderId, interval: TimeInterval) -> Self {
        Self {
            provider_id,
            subject_id: None,
            interval,
            exclude: None,
        }
    }

    pub fn with_subject(mut self, subject_id: SubjectId) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    pub fn with_subject_opt(mut self, subject_id: Option<SubjectId>) -> Self {
        self.subject_id = subject_id;
        self
    }

    pub fn excluding(mut self, booking_id: BookingId) -> Self {
        self.exclude = Some(booking_id);
        self
    }

    pub fn excluding_opt(mut self, booking_id: Option<BookingId>) -> Self {
        self.exclude = booking_id;
        self
    }
}

/// The conflict predicate: active status, provider or subject match,
/// half-open overlap, and id exclusion.
pub fn conflicts_with(booking: &Booking, query: &ConflictQuery) -> bool {
    if !booking.status.is_active() {
        return false;
    }
    if query.exclude == Some(booking.id) {
        return false;
    }
    let same_party = booking.provider_id == query.provider_id
        || query
            .subject_id
            .is_some_and(|subject_id| booking.subject_id == subject_id);
    same_party && booking.overlaps(&query.interval)
}

/// Return the active bookings that would collide with the candidate
/// interval, ordered by start. Emptiness means "free".
///
/// This is the advisory read path; the guarded repository writes re-run the
/// same predicate inside their critical section.
pub async fn conflicting_bookings(
    repo: &dyn FullRepository,
    query: &ConflictQuery,
) -> SchedulingResult<Vec<Booking>> {
    if !query.interval.is_well_formed() {
        return Err(SchedulingError::Validation(
            "end must be after start".to_string(),
        ));
    }
    Ok(repo.find_conflicts(query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BookingId, ProviderId, SubjectId};
    use crate::models::BookingStatus;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn booking(id: i64, provider: i64, subject: i64, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId(id),
            provider_id: ProviderId(provider),
            subject_id: SubjectId(subject),
            start: at(9, 0),
            end: at(9, 30),
            status,
            reason: String::new(),
            location: String::new(),
            created_at: at(8, 0),
            updated_at: at(8, 0),
        }
    }

    fn query(provider: i64, h0: u32, m0: u32, h1: u32, m1: u32) -> ConflictQuery {
        ConflictQuery::new(
            ProviderId(provider),
            TimeInterval::new(at(h0, m0), at(h1, m1)),
        )
    }

    #[test]
    fn test_provider_overlap_conflicts() {
        let existing = booking(1, 10, 20, BookingStatus::Scheduled);
        assert!(conflicts_with(&existing, &query(10, 9, 15, 9, 45)));
    }

    #[test]
    fn test_other_provider_no_subject_does_not_conflict() {
        let existing = booking(1, 10, 20, BookingStatus::Scheduled);
        assert!(!conflicts_with(&existing, &query(11, 9, 15, 9, 45)));
    }

    #[test]
    fn test_subject_conflicts_across_providers() {
        let existing = booking(1, 10, 20, BookingStatus::Confirmed);
        let q = query(11, 9, 15, 9, 45).with_subject(SubjectId(20));
        assert!(conflicts_with(&existing, &q));
    }

    #[test]
    fn test_inactive_statuses_never_conflict() {
        for status in [
            BookingStatus::Requested,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            let existing = booking(1, 10, 20, status);
            assert!(!conflicts_with(&existing, &query(10, 9, 0, 9, 30)));
        }
    }

    #[test]
    fn test_back_to_back_does_not_conflict() {
        let existing = booking(1, 10, 20, BookingStatus::Scheduled);
        assert!(!conflicts_with(&existing, &query(10, 9, 30, 10, 0)));
        assert!(!conflicts_with(&existing, &query(10, 8, 30, 9, 0)));
    }

    #[test]
    fn test_excluded_booking_is_ignored() {
        let existing = booking(5, 10, 20, BookingStatus::Scheduled);
        let q = query(10, 9, 15, 9, 45).excluding(BookingId(5));
        assert!(!conflicts_with(&existing, &q));

        let other = query(10, 9, 15, 9, 45).excluding(BookingId(6));
        assert!(conflicts_with(&existing, &other));
    }
}
