//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Free-slot suggestions
        .route("/free-slots", get(handlers::free_slots))
        // Booking write path + reads
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings", get(handlers::list_bookings))
        .route("/bookings/{booking_id}", get(handlers::get_booking))
        .route(
            "/bookings/{booking_id}/reschedule",
            post(handlers::reschedule_booking),
        )
        .route("/bookings/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/bookings/{booking_id}/approve", post(handlers::approve_booking))
        .route("/bookings/{booking_id}/decline", post(handlers::decline_booking))
        .route(
            "/bookings/{booking_id}/complete",
            post(handlers::complete_booking),
        )
        // Availability administration
        .route("/availability", get(handlers::list_availability))
        .route("/availability", post(handlers::create_availability))
        .route(
            "/availability/{window_id}/deactivate",
            post(handlers::deactivate_availability),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::services::NullEventSink;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo =
            Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let state = AppState::new(repo, Arc::new(NullEventSink));
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
