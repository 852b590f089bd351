//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using HashMaps, providing fast, deterministic, and isolated
//! execution.
//!
//! The single write lock doubles as the transactional guard required by the
//! booking write path: a guarded write holds it across the conflict
//! re-check and the insert/update, so two racing writers serialize.

use async_trait::async_trait;
use chrono::{Utc, Weekday};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{BookingId, ProviderId, WindowId};
use crate::db::repository::{
    AvailabilityRepository, BookingFilter, BookingRepository, GuardedWrite, RepositoryError,
    RepositoryResult,
};
use crate::models::{
    AvailabilityWindow, Booking, BookingStatus, NewAvailabilityWindow, NewBooking, TimeInterval,
};
use crate::services::conflicts::{conflicts_with, ConflictQuery};

/// In-memory local repository.
///
/// # Example
/// ```ignore
/// let repo = LocalRepository::new();
/// let windows = repo.active_windows(ProviderId(1)).await.unwrap();
/// assert!(windows.is_empty());
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    windows: HashMap<WindowId, AvailabilityWindow>,
    bookings: HashMap<BookingId, Booking>,

    // ID counters
    next_window_id: i64,
    next_booking_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            windows: HashMap::new(),
            bookings: HashMap::new(),
            next_window_id: 1,
            next_booking_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let is_healthy = data.is_healthy;
        *data = LocalData {
            is_healthy,
            ..Default::default()
        };
    }

    /// Number of stored bookings, any status.
    pub fn booking_count(&self) -> usize {
        self.data.read().bookings.len()
    }

    /// Number of stored availability windows, active or not.
    pub fn window_count(&self) -> usize {
        self.data.read().windows.len()
    }

    /// Helper to check health and return an error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_windows(mut windows: Vec<AvailabilityWindow>) -> Vec<AvailabilityWindow> {
    windows.sort_by_key(|w| (w.weekday.num_days_from_monday(), w.start_time, w.id));
    windows
}

fn conflicts_in(data: &LocalData, query: &ConflictQuery) -> Vec<Booking> {
    let mut conflicts: Vec<Booking> = data
        .bookings
        .values()
        .filter(|booking| conflicts_with(booking, query))
        .cloned()
        .collect();
    conflicts.sort_by_key(|b| (b.start, b.id));
    conflicts
}

#[async_trait]
impl AvailabilityRepository for LocalRepository {
    async fn create_window(
        &self,
        window: &NewAvailabilityWindow,
    ) -> RepositoryResult<AvailabilityWindow> {
        self.check_health()?;

        let mut data = self.data.write();

        // Mirror the unique (provider, weekday, start, end) constraint.
        let duplicate = data.windows.values().any(|existing| {
            existing.provider_id == window.provider_id
                && existing.weekday == window.weekday
                && existing.start_time == window.start_time
                && existing.end_time == window.end_time
        });
        if duplicate {
            return Err(RepositoryError::validation(format!(
                "duplicate availability window for provider {} on weekday {}",
                window.provider_id, window.weekday
            )));
        }

        let id = WindowId(data.next_window_id);
        data.next_window_id += 1;
        let now = Utc::now();
        let stored = AvailabilityWindow {
            id,
            provider_id: window.provider_id,
            weekday: window.weekday,
            start_time: window.start_time,
            end_time: window.end_time,
            slot_minutes: window.slot_minutes,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        data.windows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_window(&self, window_id: WindowId) -> RepositoryResult<AvailabilityWindow> {
        self.check_health()?;
        self.data
            .read()
            .windows
            .get(&window_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Availability window {} not found", window_id))
            })
    }

    async fn list_windows(
        &self,
        provider_id: ProviderId,
        weekday: Option<Weekday>,
    ) -> RepositoryResult<Vec<AvailabilityWindow>> {
        self.check_health()?;
        let windows = self
            .data
            .read()
            .windows
            .values()
            .filter(|w| w.provider_id == provider_id)
            .filter(|w| weekday.is_none_or(|d| w.weekday == d))
            .cloned()
            .collect();
        Ok(sorted_windows(windows))
    }

    async fn active_windows(
        &self,
        provider_id: ProviderId,
    ) -> RepositoryResult<Vec<AvailabilityWindow>> {
        self.check_health()?;
        let windows = self
            .data
            .read()
            .windows
            .values()
            .filter(|w| w.provider_id == provider_id && w.is_active)
            .cloned()
            .collect();
        Ok(sorted_windows(windows))
    }

    async fn set_window_active(
        &self,
        window_id: WindowId,
        is_active: bool,
    ) -> RepositoryResult<AvailabilityWindow> {
        self.check_health()?;
        let mut data = self.data.write();
        let window = data.windows.get_mut(&window_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Availability window {} not found", window_id))
        })?;
        window.is_active = is_active;
        window.updated_at = Utc::now();
        Ok(window.clone())
    }
}

#[async_trait]
impl BookingRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking> {
        self.check_health()?;
        self.data
            .read()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Booking {} not found", booking_id)))
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Vec<Booking>> {
        self.check_health()?;
        let mut bookings: Vec<Booking> = self
            .data
            .read()
            .bookings
            .values()
            .filter(|b| filter.provider_id.is_none_or(|p| b.provider_id == p))
            .filter(|b| filter.subject_id.is_none_or(|s| b.subject_id == s))
            .filter(|b| filter.from.is_none_or(|from| b.end > from))
            .filter(|b| filter.to.is_none_or(|to| b.start < to))
            .filter(|b| filter.status.is_none_or(|st| b.status == st))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.start.cmp(&a.start).then(a.id.cmp(&b.id)));
        Ok(bookings)
    }

    async fn find_conflicts(&self, query: &ConflictQuery) -> RepositoryResult<Vec<Booking>> {
        self.check_health()?;
        Ok(conflicts_in(&self.data.read(), query))
    }

    async fn insert_booking(&self, new: &NewBooking) -> RepositoryResult<GuardedWrite> {
        self.check_health()?;
        if !new.interval().is_well_formed() {
            return Err(RepositoryError::validation("end must be after start"));
        }

        // Holds the write lock across the re-check and the insert.
        let mut data = self.data.write();
        let query = ConflictQuery::new(new.provider_id, new.interval()).with_subject(new.subject_id);
        let conflicts = conflicts_in(&data, &query);
        if !conflicts.is_empty() {
            return Ok(GuardedWrite::Conflicted(conflicts));
        }

        let id = BookingId(data.next_booking_id);
        data.next_booking_id += 1;
        let now = Utc::now();
        let booking = Booking {
            id,
            provider_id: new.provider_id,
            subject_id: new.subject_id,
            start: new.start,
            end: new.end,
            status: new.status,
            reason: new.reason.clone(),
            location: new.location.clone(),
            created_at: now,
            updated_at: now,
        };
        data.bookings.insert(id, booking.clone());
        Ok(GuardedWrite::Committed(booking))
    }

    async fn reschedule_booking(
        &self,
        booking_id: BookingId,
        interval: TimeInterval,
    ) -> RepositoryResult<GuardedWrite> {
        self.check_health()?;
        if !interval.is_well_formed() {
            return Err(RepositoryError::validation("end must be after start"));
        }

        let mut data = self.data.write();
        let existing = data
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Booking {} not found", booking_id)))?;

        let query = ConflictQuery::new(existing.provider_id, interval)
            .with_subject(existing.subject_id)
            .excluding(booking_id);
        let conflicts = conflicts_in(&data, &query);
        if !conflicts.is_empty() {
            return Ok(GuardedWrite::Conflicted(conflicts));
        }

        let booking = data
            .bookings
            .get_mut(&booking_id)
            .expect("booking disappeared while holding the write lock");
        booking.start = interval.start;
        booking.end = interval.end;
        booking.updated_at = Utc::now();
        Ok(GuardedWrite::Committed(booking.clone()))
    }

    async fn update_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking> {
        self.check_health()?;
        let mut data = self.data.write();
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Booking {} not found", booking_id)))?;
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}
