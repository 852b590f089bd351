//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic. The optional `x-actor` header feeds
//! the audit events; authentication itself lives outside this core.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::dto::{
    ApproveRequest, AvailabilityQuery, BookingListResponse, CreateAvailabilityRequest,
    CreateBookingRequest, FreeSlotsQuery, HealthResponse, ListBookingsQuery, RescheduleRequest,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{BookingId, ProviderId, SubjectId, WindowId};
use crate::db::repository::{BookingFilter, BookingRepository};
use crate::models::{
    weekday_from_number, AvailabilityWindow, Booking, BookingStatus, NewAvailabilityWindow,
    NewBooking, TimeInterval,
};
use crate::services::{availability_admin, FreeSlot, FreeSlotRequest};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn actor_from(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-actor").and_then(|v| v.to_str().ok())
}

fn parse_status(raw: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::from_str(raw).map_err(AppError::BadRequest)
}

fn parse_weekday(raw: u8) -> Result<chrono::Weekday, AppError> {
    weekday_from_number(raw).ok_or_else(|| {
        AppError::BadRequest(format!("weekday must be 0-6 (Monday=0), got {}", raw))
    })
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the store is
/// reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Free slots
// =============================================================================

/// GET /v1/free-slots
///
/// Suggest bookable slots for a provider within a date range, based on
/// weekly availability and existing bookings. Optional `subject_id` avoids
/// the subject's own conflicts.
pub async fn free_slots(
    State(state): State<AppState>,
    Query(query): Query<FreeSlotsQuery>,
) -> HandlerResult<Vec<FreeSlot>> {
    let mut request = FreeSlotRequest::new(
        ProviderId(query.provider_id),
        TimeInterval::new(query.date_from, query.date_to),
        query.duration_minutes,
    );
    request.step_minutes = query.step_minutes;
    request.subject_id = query.subject_id.map(SubjectId);
    if let Some(limit) = query.limit {
        request = request.with_limit(limit);
    }

    let slots = state.flow.free_slots(&request).await?;
    Ok(Json(slots))
}

// =============================================================================
// Bookings
// =============================================================================

/// POST /v1/bookings
///
/// Create a booking. Rejects overlaps for the same provider or subject with
/// a 409 and a conflicts list.
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let status = if request.require_approval {
        BookingStatus::Requested
    } else {
        BookingStatus::Scheduled
    };
    let mut new = NewBooking::new(
        ProviderId(request.provider_id),
        SubjectId(request.subject_id),
        request.start,
        request.end,
    )
    .with_status(status);
    if let Some(reason) = request.reason {
        new = new.with_reason(reason);
    }
    if let Some(location) = request.location {
        new = new.with_location(location);
    }

    let booking = state.flow.create(actor_from(&headers), &new).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings
///
/// List bookings with optional provider/subject/date-range/status filters.
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> HandlerResult<BookingListResponse> {
    let filter = BookingFilter {
        provider_id: query.provider_id.map(ProviderId),
        subject_id: query.subject_id.map(SubjectId),
        from: query.date_from,
        to: query.date_to,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };

    let bookings = state.repository.list_bookings(&filter).await?;
    let total = bookings.len();
    Ok(Json(BookingListResponse { bookings, total }))
}

/// GET /v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
) -> HandlerResult<Booking> {
    let booking = state.repository.get_booking(BookingId(booking_id)).await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/reschedule
///
/// Moves start/end if there's no conflict; otherwise returns a 409 with the
/// conflicts list.
pub async fn reschedule_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<RescheduleRequest>,
) -> HandlerResult<Booking> {
    let booking = state
        .flow
        .reschedule(
            actor_from(&headers),
            BookingId(booking_id),
            TimeInterval::new(request.start, request.end),
        )
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    headers: HeaderMap,
) -> HandlerResult<Booking> {
    let booking = state
        .flow
        .cancel(actor_from(&headers), BookingId(booking_id))
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/approve
///
/// Approve a requested booking into `scheduled` or `confirmed` (default).
pub async fn approve_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<ApproveRequest>,
) -> HandlerResult<Booking> {
    let to = match request.status.as_deref() {
        None => BookingStatus::Confirmed,
        Some(raw) => parse_status(raw)?,
    };
    let booking = state
        .flow
        .approve(actor_from(&headers), BookingId(booking_id), to)
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/decline
pub async fn decline_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    headers: HeaderMap,
) -> HandlerResult<Booking> {
    let booking = state
        .flow
        .decline(actor_from(&headers), BookingId(booking_id))
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/complete
pub async fn complete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    headers: HeaderMap,
) -> HandlerResult<Booking> {
    let booking = state
        .flow
        .complete(actor_from(&headers), BookingId(booking_id))
        .await?;
    Ok(Json(booking))
}

// =============================================================================
// Availability windows
// =============================================================================

/// GET /v1/availability
pub async fn list_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> HandlerResult<Vec<AvailabilityWindow>> {
    let weekday = query.weekday.map(parse_weekday).transpose()?;
    let windows = availability_admin::list_windows(
        state.repository.as_ref(),
        ProviderId(query.provider_id),
        weekday,
    )
    .await?;
    Ok(Json(windows))
}

/// POST /v1/availability
pub async fn create_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<(StatusCode, Json<AvailabilityWindow>), AppError> {
    let weekday = parse_weekday(request.weekday)?;
    let mut new = NewAvailabilityWindow::new(
        ProviderId(request.provider_id),
        weekday,
        request.start_time,
        request.end_time,
    );
    if let Some(slot_minutes) = request.slot_minutes {
        new = new.with_slot_minutes(slot_minutes);
    }

    let window = availability_admin::create_window(
        state.repository.as_ref(),
        state.events.as_ref(),
        actor_from(&headers),
        &new,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(window)))
}

/// POST /v1/availability/{id}/deactivate
pub async fn deactivate_availability(
    State(state): State<AppState>,
    Path(window_id): Path<i64>,
    headers: HeaderMap,
) -> HandlerResult<AvailabilityWindow> {
    let window = availability_admin::deactivate_window(
        state.repository.as_ref(),
        state.events.as_ref(),
        actor_from(&headers),
        WindowId(window_id),
    )
    .await?;
    Ok(Json(window))
}
