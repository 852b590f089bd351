//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::Booking;
use crate::services::SchedulingError;

/// Cap on conflicting bookings echoed back in a 409 body.
const MAX_CONFLICTS_REPORTED: usize = 10;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// One colliding booking in a 409 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub id: i64,
    pub provider_id: i64,
    pub subject_id: i64,
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub status: crate::models::BookingStatus,
}

impl From<&Booking> for ConflictEntry {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.value(),
            provider_id: booking.provider_id.value(),
            subject_id: booking.subject_id.value(),
            start: booking.start,
            end: booking.end,
            status: booking.status,
        }
    }
}

/// Body of a 409 conflict response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictBody {
    pub detail: String,
    pub conflicts: Vec<ConflictEntry>,
    pub hint: String,
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// The requested interval collides with existing bookings
    Conflict(Vec<Booking>),
    /// Transient write race; the client should retry
    Unavailable(String),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(ApiError::new("NOT_FOUND", msg))).into_response()
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new("BAD_REQUEST", msg)),
            )
                .into_response(),
            AppError::Conflict(conflicts) => {
                let body = ConflictBody {
                    detail: "Time slot conflicts with existing bookings.".to_string(),
                    conflicts: conflicts
                        .iter()
                        .take(MAX_CONFLICTS_REPORTED)
                        .map(ConflictEntry::from)
                        .collect(),
                    hint: "Pick a free slot or reschedule conflicting entries.".to_string(),
                };
                (StatusCode::CONFLICT, Json(body)).into_response()
            }
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::new("TRY_AGAIN", msg)),
            )
                .into_response(),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("INTERNAL_ERROR", msg)),
            )
                .into_response(),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::BadRequest(msg),
            SchedulingError::NotFound(msg) => AppError::NotFound(msg),
            SchedulingError::Conflict(conflicts) => AppError::Conflict(conflicts),
            SchedulingError::Concurrency => {
                AppError::Unavailable("write lost a concurrent update race; retry".to_string())
            }
            SchedulingError::Repository(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<crate::db::repository::RepositoryError> for AppError {
    fn from(err: crate::db::repository::RepositoryError) -> Self {
        AppError::from(SchedulingError::from(err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
