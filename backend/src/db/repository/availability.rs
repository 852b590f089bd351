//! Repository trait for availability windows.

use async_trait::async_trait;
use chrono::Weekday;

use super::error::RepositoryResult;
use crate::api::{ProviderId, WindowId};
use crate::models::{AvailabilityWindow, NewAvailabilityWindow};

/// Repository trait for a provider's recurring weekly availability.
///
/// The core only ever reads *active* windows; creation and soft-disabling
/// exist for the administrative configuration surface. Windows are never
/// hard-deleted.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Store a new availability window.
    ///
    /// # Returns
    /// * `Ok(AvailabilityWindow)` - The stored window including assigned ID
    /// * `Err(RepositoryError::ValidationError)` - On an exact duplicate of
    ///   an existing window for the same provider/weekday
    async fn create_window(
        &self,
        window: &NewAvailabilityWindow,
    ) -> RepositoryResult<AvailabilityWindow>;

    /// Retrieve a window by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the window doesn't exist
    async fn get_window(&self, window_id: WindowId) -> RepositoryResult<AvailabilityWindow>;

    /// List a provider's windows, active or not, optionally filtered by
    /// weekday. Ordered by `(weekday, start_time)`.
    async fn list_windows(
        &self,
        provider_id: ProviderId,
        weekday: Option<Weekday>,
    ) -> RepositoryResult<Vec<AvailabilityWindow>>;

    /// List only the provider's active windows, ordered by
    /// `(weekday, start_time)`. This is what the slot generator consumes.
    async fn active_windows(
        &self,
        provider_id: ProviderId,
    ) -> RepositoryResult<Vec<AvailabilityWindow>>;

    /// Soft-enable or soft-disable a window.
    ///
    /// # Returns
    /// * `Ok(AvailabilityWindow)` - The updated window
    /// * `Err(RepositoryError::NotFound)` - If the window doesn't exist
    async fn set_window_active(
        &self,
        window_id: WindowId,
        is_active: bool,
    ) -> RepositoryResult<AvailabilityWindow>;
}
