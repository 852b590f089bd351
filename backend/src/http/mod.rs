//! Axum-based HTTP server exposing the scheduling core.
//!
//! This module is gated behind the `http-server` feature and provides:
//!
//! - [`router`]: route table and middleware stack
//! - [`handlers`]: request handlers delegating to the service layer
//! - [`dto`]: request/response types
//! - [`error`]: error-to-status mapping (409 with a conflicts list, etc.)
//! - [`state`]: shared application state

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;
