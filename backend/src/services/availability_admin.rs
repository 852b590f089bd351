//! Administrative operations on availability windows.
//!
//! The booking core only reads active windows; these operations are the
//! thin write surface used by provider/staff configuration screens.
//! Windows are soft-disabled, never deleted.

use chrono::Weekday;

use super::error::{SchedulingError, SchedulingResult};
use super::events::{AuditEvent, EventSink};
use crate::api::{ProviderId, WindowId};
use crate::db::repository::{AvailabilityRepository, FullRepository};
use crate::models::{AvailabilityWindow, NewAvailabilityWindow};

/// Create a weekly availability window for a provider.
///
/// Exact duplicates of an existing window are rejected by the store.
pub async fn create_window(
    repo: &dyn FullRepository,
    events: &dyn EventSink,
    actor: Option<&str>,
    new: &NewAvailabilityWindow,
) -> SchedulingResult<AvailabilityWindow> {
    if new.end_time <= new.start_time {
        return Err(SchedulingError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }
    if new.slot_minutes == 0 {
        return Err(SchedulingError::Validation(
            "slot_minutes must be positive".to_string(),
        ));
    }

    let window = repo.create_window(new).await?;
    tracing::info!(window_id = %window.id, provider_id = %window.provider_id, "availability window created");
    events.audit_event(&AuditEvent::new(
        actor,
        "availability.create",
        "AvailabilityWindow",
        window.id,
    ));
    Ok(window)
}

/// List a provider's windows, optionally restricted to one weekday.
pub async fn list_windows(
    repo: &dyn FullRepository,
    provider_id: ProviderId,
    weekday: Option<Weekday>,
) -> SchedulingResult<Vec<AvailabilityWindow>> {
    Ok(repo.list_windows(provider_id, weekday).await?)
}

/// Soft-disable a window so it stops feeding the slot generator. Already
/// generated, not-yet-booked suggestions simply fail the availability check
/// again at booking time.
pub async fn deactivate_window(
    repo: &dyn FullRepository,
    events: &dyn EventSink,
    actor: Option<&str>,
    window_id: WindowId,
) -> SchedulingResult<AvailabilityWindow> {
    let window = repo.set_window_active(window_id, false).await?;
    events.audit_event(&AuditEvent::new(
        actor,
        "availability.deactivate",
        "AvailabilityWindow",
        window.id,
    ));
    Ok(window)
}

/// Re-enable a previously disabled window.
pub async fn reactivate_window(
    repo: &dyn FullRepository,
    events: &dyn EventSink,
    actor: Option<&str>,
    window_id: WindowId,
) -> SchedulingResult<AvailabilityWindow> {
    let window = repo.set_window_active(window_id, true).await?;
    events.audit_event(&AuditEvent::new(
        actor,
        "availability.reactivate",
        "AvailabilityWindow",
        window.id,
    ));
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalRepository;
    use crate::services::events::NullEventSink;
    use chrono::NaiveTime;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_times() {
        let repo = LocalRepository::new();
        let sink = NullEventSink;

        let inverted = NewAvailabilityWindow::new(
            ProviderId(1),
            chrono::Weekday::Mon,
            hm(17, 0),
            hm(9, 0),
        );
        let err = create_window(&repo, &sink, None, &inverted)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));

        let zero_slot = NewAvailabilityWindow::new(
            ProviderId(1),
            chrono::Weekday::Mon,
            hm(9, 0),
            hm(17, 0),
        )
        .with_slot_minutes(0);
        let err = create_window(&repo, &sink, None, &zero_slot)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_window_is_validation_error() {
        let repo = LocalRepository::new();
        let sink = NullEventSink;
        let new = NewAvailabilityWindow::new(
            ProviderId(1),
            chrono::Weekday::Tue,
            hm(9, 0),
            hm(12, 0),
        );

        create_window(&repo, &sink, None, &new).await.unwrap();
        let err = create_window(&repo, &sink, None, &new).await.unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deactivate_and_reactivate() {
        let repo = LocalRepository::new();
        let sink = NullEventSink;
        let window = create_window(
            &repo,
            &sink,
            Some("admin"),
            &NewAvailabilityWindow::new(ProviderId(1), chrono::Weekday::Wed, hm(9, 0), hm(12, 0)),
        )
        .await
        .unwrap();

        let disabled = deactivate_window(&repo, &sink, Some("admin"), window.id)
            .await
            .unwrap();
        assert!(!disabled.is_active);

        let listed = list_windows(&repo, ProviderId(1), Some(chrono::Weekday::Wed))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let enabled = reactivate_window(&repo, &sink, Some("admin"), window.id)
            .await
            .unwrap();
        assert!(enabled.is_active);
    }

    #[tokio::test]
    async fn test_deactivate_missing_window_not_found() {
        let repo = LocalRepository::new();
        let err = deactivate_window(&repo, &NullEventSink, None, WindowId(99))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound(_)));
    }
}
