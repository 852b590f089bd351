//! Error taxonomy for scheduling operations.
//!
//! Every operation recovers storage faults at the write-path boundary and
//! returns one of these structured outcomes; nothing here is fatal to the
//! hosting process.

use crate::db::repository::RepositoryError;
use crate::models::Booking;

/// Result type for scheduling operations.
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Typed failures of the scheduling core.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    /// Malformed input (inverted interval, non-positive duration, illegal
    /// state transition). Rejected before any store access.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The requested interval collides with existing active bookings.
    /// Carries the colliding bookings so the caller can present
    /// alternatives; an expected, routine outcome.
    #[error("time slot conflicts with {} existing booking(s)", .0.len())]
    Conflict(Vec<Booking>),

    /// Referenced booking or window does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage guard aborted the write after repeated races with
    /// concurrent writers. Retrying the whole operation with fresh data may
    /// succeed.
    #[error("write aborted after concurrent updates; please try again")]
    Concurrency,

    /// Storage fault that is neither a missing record nor a transient race.
    #[error("storage error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SchedulingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { message, .. } => SchedulingError::NotFound(message),
            RepositoryError::ValidationError { message, .. } => {
                SchedulingError::Validation(message)
            }
            other => SchedulingError::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err: SchedulingError = RepositoryError::not_found("booking 9").into();
        assert!(matches!(err, SchedulingError::NotFound(_)));
    }

    #[test]
    fn test_storage_validation_maps_to_validation() {
        let err: SchedulingError = RepositoryError::validation("duplicate window").into();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err: SchedulingError = RepositoryError::connection("down").into();
        assert!(matches!(err, SchedulingError::Repository(_)));
    }

    #[test]
    fn test_conflict_message_counts() {
        let err = SchedulingError::Conflict(Vec::new());
        assert!(err.to_string().contains("0 existing"));
    }
}
