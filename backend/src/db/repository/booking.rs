//! Repository trait for bookings, including the guarded write operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RepositoryResult;
use crate::api::{BookingId, ProviderId, SubjectId};
use crate::models::{Booking, BookingStatus, NewBooking, TimeInterval};
use crate::services::conflicts::ConflictQuery;

/// Outcome of a guarded (check-and-write) booking mutation.
///
/// The conflict re-check runs inside the storage-side critical section
/// (write lock or transaction), so a `Committed` result means no active
/// booking overlapped at commit time. A concurrent writer losing the race
/// surfaces as a retryable transaction error instead.
#[derive(Debug, Clone)]
pub enum GuardedWrite {
    /// The write committed; here is the persisted booking.
    Committed(Booking),
    /// The interval collided with these active bookings; nothing was written.
    Conflicted(Vec<Booking>),
}

/// Filters for listing bookings.
///
/// `from`/`to` select bookings whose interval overlaps `[from, to)` under
/// the half-open convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    pub provider_id: Option<ProviderId>,
    pub subject_id: Option<SubjectId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn for_provider(provider_id: ProviderId) -> Self {
        Self {
            provider_id: Some(provider_id),
            ..Default::default()
        }
    }

    pub fn for_subject(subject_id: SubjectId) -> Self {
        Self {
            subject_id: Some(subject_id),
            ..Default::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Repository trait for booking storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the storage backend is reachable and healthy.
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Reads ====================

    /// Retrieve a booking by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the booking doesn't exist
    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking>;

    /// List bookings matching the filter, ordered by start descending then
    /// id ascending (most recent first, stable within a start time).
    async fn list_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Vec<Booking>>;

    /// Advisory conflict read: active bookings overlapping the query's
    /// interval for the query's provider or subject, ordered by start.
    ///
    /// Emptiness means "free" at read time only; writes must go through the
    /// guarded operations below, which re-run this predicate atomically.
    async fn find_conflicts(&self, query: &ConflictQuery) -> RepositoryResult<Vec<Booking>>;

    // ==================== Guarded writes ====================

    /// Insert a booking after an atomic conflict re-check.
    async fn insert_booking(&self, new: &NewBooking) -> RepositoryResult<GuardedWrite>;

    /// Move a booking to a new interval after an atomic conflict re-check
    /// that excludes the booking's own id. Status and identity are
    /// unchanged.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the booking doesn't exist
    async fn reschedule_booking(
        &self,
        booking_id: BookingId,
        interval: TimeInterval,
    ) -> RepositoryResult<GuardedWrite>;

    // ==================== Status updates ====================

    /// Overwrite a booking's status. Transition legality is the service
    /// layer's responsibility; the repository only persists.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the booking doesn't exist
    async fn update_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking>;
}
