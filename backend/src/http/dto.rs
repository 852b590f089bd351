//! Data Transfer Objects for the HTTP API.
//!
//! These DTOs are used for request/response serialization in the REST API.
//! Domain types (`Booking`, `AvailabilityWindow`, `FreeSlot`) already derive
//! Serialize/Deserialize and are returned directly.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export the response types handlers return as-is
pub use crate::models::{AvailabilityWindow, Booking};
pub use crate::services::FreeSlot;

/// Query parameters for the free-slots endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSlotsQuery {
    pub provider_id: i64,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub step_minutes: Option<i64>,
    /// Also exclude this subject's own conflicts with other providers.
    #[serde(default)]
    pub subject_id: Option<i64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request body for creating a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub provider_id: i64,
    pub subject_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Self-service flows set this to park the booking as `requested`
    /// until a provider approves it.
    #[serde(default)]
    pub require_approval: bool,
}

/// Request body for rescheduling a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Request body for approving a requested booking.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApproveRequest {
    /// Target status: "scheduled" or "confirmed" (default).
    #[serde(default)]
    pub status: Option<String>,
}

/// Query parameters for listing bookings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListBookingsQuery {
    #[serde(default)]
    pub provider_id: Option<i64>,
    #[serde(default)]
    pub subject_id: Option<i64>,
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Query parameters for listing availability windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub provider_id: i64,
    /// 0-6, Monday = 0
    #[serde(default)]
    pub weekday: Option<u8>,
}

/// Request body for creating an availability window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub provider_id: i64,
    /// 0-6, Monday = 0
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub slot_minutes: Option<u32>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Booking list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub total: usize,
}
