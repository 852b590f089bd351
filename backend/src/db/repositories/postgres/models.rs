//! Diesel row types and domain conversions for the Postgres repository.

use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use super::schema::{availability_windows, bookings};
use crate::api::{BookingId, ProviderId, SubjectId, WindowId};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{
    weekday_from_number, weekday_number, AvailabilityWindow, Booking, BookingStatus,
    NewAvailabilityWindow, NewBooking,
};

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = availability_windows)]
pub struct WindowRow {
    pub id: i64,
    pub provider_id: i64,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WindowRow> for AvailabilityWindow {
    type Error = RepositoryError;

    fn try_from(row: WindowRow) -> RepositoryResult<Self> {
        let weekday = u8::try_from(row.weekday)
            .ok()
            .and_then(weekday_from_number)
            .ok_or_else(|| {
                RepositoryError::internal_with_context(
                    format!("invalid weekday {} in stored window", row.weekday),
                    ErrorContext::new("decode_window")
                        .with_entity("availability_window")
                        .with_entity_id(row.id),
                )
            })?;
        Ok(AvailabilityWindow {
            id: WindowId(row.id),
            provider_id: ProviderId(row.provider_id),
            weekday,
            start_time: row.start_time,
            end_time: row.end_time,
            slot_minutes: row.slot_minutes.max(0) as u32,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = availability_windows)]
pub struct NewWindowRow {
    pub provider_id: i64,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

impl From<&NewAvailabilityWindow> for NewWindowRow {
    fn from(window: &NewAvailabilityWindow) -> Self {
        Self {
            provider_id: window.provider_id.value(),
            weekday: weekday_number(window.weekday) as i16,
            start_time: window.start_time,
            end_time: window.end_time,
            slot_minutes: window.slot_minutes as i32,
        }
    }
}

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = bookings)]
pub struct BookingRow {
    pub id: i64,
    pub provider_id: i64,
    pub subject_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub reason: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> RepositoryResult<Self> {
        let status = BookingStatus::from_str(&row.status).map_err(|e| {
            RepositoryError::internal_with_context(
                e,
                ErrorContext::new("decode_booking")
                    .with_entity("booking")
                    .with_entity_id(row.id),
            )
        })?;
        Ok(Booking {
            id: BookingId(row.id),
            provider_id: ProviderId(row.provider_id),
            subject_id: SubjectId(row.subject_id),
            start: row.start_at,
            end: row.end_at,
            status,
            reason: row.reason,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub provider_id: i64,
    pub subject_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub reason: String,
    pub location: String,
}

impl From<&NewBooking> for NewBookingRow {
    fn from(new: &NewBooking) -> Self {
        Self {
            provider_id: new.provider_id.value(),
            subject_id: new.subject_id.value(),
            start_at: new.start,
            end_at: new.end,
            status: new.status.as_str().to_string(),
            reason: new.reason.clone(),
            location: new.location.clone(),
        }
    }
}
