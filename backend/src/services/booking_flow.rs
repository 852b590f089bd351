//! The booking write path: create, reschedule, cancel, approve, decline,
//! complete.
//!
//! Every mutation validates its input before touching the store, re-runs the
//! conflict check inside the storage guard where the interval changes, and
//! emits one domain event plus one audit event on success. Transient storage
//! races are retried with fresh data a bounded number of times before
//! surfacing as a concurrency failure.

use std::sync::Arc;

use super::conflicts::{conflicting_bookings, ConflictQuery};
use super::error::{SchedulingError, SchedulingResult};
use super::events::{AuditEvent, BookingEvent, BookingEventKind, EventSink};
use super::slots::{suggest_free_slots, FreeSlot, FreeSlotRequest};
use crate::api::BookingId;
use crate::db::repository::{BookingRepository, FullRepository, GuardedWrite, RepositoryResult};
use crate::models::{Booking, BookingStatus, NewBooking, TimeInterval};

/// Default bound on guarded-write attempts before giving up on a race.
const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// Orchestrates booking mutations over a repository and an event sink.
///
/// The sink and the retry budget are fixed at construction; nothing is read
/// from ambient process state.
pub struct BookingFlow {
    repo: Arc<dyn FullRepository>,
    events: Arc<dyn EventSink>,
    max_write_attempts: u32,
}

impl BookingFlow {
    pub fn new(repo: Arc<dyn FullRepository>, events: Arc<dyn EventSink>) -> Self {
        Self {
            repo,
            events,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    /// Run a guarded write, retrying transient storage failures with fresh
    /// state. A conflict result is final, not retried.
    async fn run_guarded<F, Fut>(&self, op: F) -> SchedulingResult<Booking>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RepositoryResult<GuardedWrite>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(GuardedWrite::Committed(booking)) => return Ok(booking),
                Ok(GuardedWrite::Conflicted(conflicts)) => {
                    return Err(SchedulingError::Conflict(conflicts))
                }
                Err(err) if err.is_retryable() && attempt < self.max_write_attempts => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "guarded booking write hit a transient storage error; retrying"
                    );
                }
                Err(err) if err.is_retryable() => return Err(SchedulingError::Concurrency),
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn emit(&self, actor: Option<&str>, kind: BookingEventKind, action: &str, id: BookingId) {
        self.events.booking_event(&BookingEvent {
            kind,
            booking_id: id,
        });
        self.events
            .audit_event(&AuditEvent::new(actor, action, "Booking", id));
    }

    /// Create a booking at a free interval.
    ///
    /// The initial status comes from the request: `Scheduled` (or
    /// `Confirmed`) for staff flows, `Requested` for self-service flows
    /// awaiting approval. On collision the conflicting bookings are
    /// returned, never a silently-picked alternative.
    pub async fn create(&self, actor: Option<&str>, new: &NewBooking) -> SchedulingResult<Booking> {
        if !new.interval().is_well_formed() {
            return Err(SchedulingError::Validation(
                "end must be after start".to_string(),
            ));
        }
        if !matches!(
            new.status,
            BookingStatus::Requested | BookingStatus::Scheduled | BookingStatus::Confirmed
        ) {
            return Err(SchedulingError::Validation(format!(
                "a booking cannot be created as {}",
                new.status
            )));
        }

        let booking = self.run_guarded(|| self.repo.insert_booking(new)).await?;
        tracing::info!(booking_id = %booking.id, provider_id = %booking.provider_id, "booking created");
        self.emit(actor, BookingEventKind::Created, "booking.create", booking.id);
        Ok(booking)
    }

    /// Move a booking to a new interval, re-validated against everything
    /// except itself. Status and identity do not change.
    pub async fn reschedule(
        &self,
        actor: Option<&str>,
        booking_id: BookingId,
        interval: TimeInterval,
    ) -> SchedulingResult<Booking> {
        if !interval.is_well_formed() {
            return Err(SchedulingError::Validation(
                "end must be after start".to_string(),
            ));
        }
        let existing = self.repo.get_booking(booking_id).await?;
        if !existing.status.is_active() {
            return Err(SchedulingError::Validation(format!(
                "only scheduled or confirmed bookings can be rescheduled; booking {} is {}",
                booking_id, existing.status
            )));
        }

        let booking = self
            .run_guarded(|| self.repo.reschedule_booking(booking_id, interval))
            .await?;
        tracing::info!(booking_id = %booking.id, "booking rescheduled");
        self.emit(
            actor,
            BookingEventKind::Rescheduled,
            "booking.reschedule",
            booking.id,
        );
        Ok(booking)
    }

    /// Cancel a booking, freeing its interval. No overlap check is needed;
    /// a cancellation never conflicts with anything.
    pub async fn cancel(
        &self,
        actor: Option<&str>,
        booking_id: BookingId,
    ) -> SchedulingResult<Booking> {
        let booking = self
            .transition(booking_id, BookingStatus::Cancelled)
            .await?;
        self.emit(
            actor,
            BookingEventKind::Cancelled,
            "booking.cancel",
            booking.id,
        );
        Ok(booking)
    }

    /// Approve a requested booking into `Scheduled` or `Confirmed`.
    ///
    /// Requested bookings do not block the calendar, so the interval is
    /// defensively re-checked before approval: time may have passed since
    /// the request was conflict-checked.
    pub async fn approve(
        &self,
        actor: Option<&str>,
        booking_id: BookingId,
        to: BookingStatus,
    ) -> SchedulingResult<Booking> {
        if !matches!(to, BookingStatus::Scheduled | BookingStatus::Confirmed) {
            return Err(SchedulingError::Validation(format!(
                "a requested booking can only be approved to scheduled or confirmed, not {}",
                to
            )));
        }
        let existing = self.repo.get_booking(booking_id).await?;
        if existing.status != BookingStatus::Requested {
            return Err(SchedulingError::Validation(format!(
                "only requested bookings can be approved; booking {} is {}",
                booking_id, existing.status
            )));
        }

        let recheck = ConflictQuery::new(existing.provider_id, existing.interval())
            .with_subject(existing.subject_id)
            .excluding(booking_id);
        let conflicts = conflicting_bookings(self.repo.as_ref(), &recheck).await?;
        if !conflicts.is_empty() {
            return Err(SchedulingError::Conflict(conflicts));
        }

        let booking = self.repo.update_status(booking_id, to).await?;
        tracing::info!(booking_id = %booking.id, status = %to, "booking approved");
        self.emit(
            actor,
            BookingEventKind::Approved,
            "booking.approve",
            booking.id,
        );
        Ok(booking)
    }

    /// Decline a requested booking.
    pub async fn decline(
        &self,
        actor: Option<&str>,
        booking_id: BookingId,
    ) -> SchedulingResult<Booking> {
        let existing = self.repo.get_booking(booking_id).await?;
        if existing.status != BookingStatus::Requested {
            return Err(SchedulingError::Validation(format!(
                "only requested bookings can be declined; booking {} is {}",
                booking_id, existing.status
            )));
        }

        let booking = self
            .repo
            .update_status(booking_id, BookingStatus::Cancelled)
            .await?;
        self.emit(
            actor,
            BookingEventKind::Declined,
            "booking.decline",
            booking.id,
        );
        Ok(booking)
    }

    /// Mark a past-dated active booking as completed (terminal).
    pub async fn complete(
        &self,
        actor: Option<&str>,
        booking_id: BookingId,
    ) -> SchedulingResult<Booking> {
        let existing = self.repo.get_booking(booking_id).await?;
        if chrono::Utc::now() < existing.end {
            return Err(SchedulingError::Validation(format!(
                "booking {} cannot be completed before it has ended",
                booking_id
            )));
        }

        let booking = self
            .transition(booking_id, BookingStatus::Completed)
            .await?;
        self.emit(
            actor,
            BookingEventKind::Completed,
            "booking.complete",
            booking.id,
        );
        Ok(booking)
    }

    /// Convenience passthrough to the free-slot service.
    pub async fn free_slots(&self, request: &FreeSlotRequest) -> SchedulingResult<Vec<FreeSlot>> {
        suggest_free_slots(self.repo.as_ref(), request).await
    }

    /// Convenience passthrough to the advisory conflict checker.
    pub async fn conflicts(&self, query: &ConflictQuery) -> SchedulingResult<Vec<Booking>> {
        conflicting_bookings(self.repo.as_ref(), query).await
    }

    /// Validate the state machine and persist a status change.
    async fn transition(
        &self,
        booking_id: BookingId,
        to: BookingStatus,
    ) -> SchedulingResult<Booking> {
        let existing = self.repo.get_booking(booking_id).await?;
        if !existing.status.can_transition_to(to) {
            return Err(SchedulingError::Validation(format!(
                "cannot move booking {} from {} to {}",
                booking_id, existing.status, to
            )));
        }
        Ok(self.repo.update_status(booking_id, to).await?)
    }
}

#[cfg(test)]
#[path = "booking_flow_tests.rs"]
mod tests;
