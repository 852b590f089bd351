//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::{BookingFlow, EventSink};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for read paths
    pub repository: Arc<dyn FullRepository>,
    /// Booking write path (state machine + events + retries)
    pub flow: Arc<BookingFlow>,
    /// Event sink, shared with the availability admin operations
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    /// Create a new application state with the given repository and sink.
    pub fn new(repository: Arc<dyn FullRepository>, events: Arc<dyn EventSink>) -> Self {
        let flow = Arc::new(BookingFlow::new(repository.clone(), events.clone()));
        Self {
            repository,
            flow,
            events,
        }
    }
}
