//! End-to-end scheduling flows over the in-memory repository, driven
//! through the public crate API the way an embedding application would.

use std::sync::Arc;

use chrono::{NaiveTime, TimeZone, Utc, Weekday};

use clinic_sched::api::{
    BookingStatus, FreeSlotRequest, NewAvailabilityWindow, NewBooking, ProviderId, SubjectId,
    TimeInterval,
};
use clinic_sched::db::{RepositoryFactory, RepositoryType};
use clinic_sched::services::{
    availability_admin, suggest_free_slots, BookingFlow, NullEventSink, SchedulingError,
};

// 2025-03-10 is a Monday.
fn monday(h: u32, m: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

fn monday_range() -> TimeInterval {
    TimeInterval::new(
        Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap(),
    )
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn test_full_booking_lifecycle() {
    let repo = RepositoryFactory::create_local();
    let sink = Arc::new(NullEventSink);
    let flow = BookingFlow::new(repo.clone(), sink);

    // Provider P is available Mondays 09:00-10:00 in 30-minute slots.
    availability_admin::create_window(
        repo.as_ref(),
        &NullEventSink,
        Some("admin"),
        &NewAvailabilityWindow::new(ProviderId(1), Weekday::Mon, hm(9, 0), hm(10, 0)),
    )
    .await
    .unwrap();

    // Two offerable slots to start with.
    let request = FreeSlotRequest::new(ProviderId(1), monday_range(), 30);
    let slots = suggest_free_slots(repo.as_ref(), &request).await.unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start, monday(9, 0));

    // Book the first one.
    let booking = flow
        .create(
            Some("reception"),
            &NewBooking::new(ProviderId(1), SubjectId(7), slots[0].start, slots[0].end),
        )
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Scheduled);

    // The booked slot is no longer offered.
    let slots = suggest_free_slots(repo.as_ref(), &request).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, monday(9, 30));

    // Move the booking into the remaining slot; its old slot frees up.
    let moved = flow
        .reschedule(
            Some("reception"),
            booking.id,
            TimeInterval::new(monday(9, 30), monday(10, 0)),
        )
        .await
        .unwrap();
    assert_eq!(moved.start, monday(9, 30));

    let slots = suggest_free_slots(repo.as_ref(), &request).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, monday(9, 0));

    // Cancelling restores both slots.
    flow.cancel(Some("reception"), booking.id).await.unwrap();
    let slots = suggest_free_slots(repo.as_ref(), &request).await.unwrap();
    assert_eq!(slots.len(), 2);
}

#[tokio::test]
async fn test_self_service_request_and_approval() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None)
        .await
        .unwrap();
    let flow = BookingFlow::new(repo.clone(), Arc::new(NullEventSink));

    let requested = flow
        .create(
            None,
            &NewBooking::new(ProviderId(1), SubjectId(7), monday(9, 0), monday(9, 30))
                .with_status(BookingStatus::Requested)
                .with_reason("first visit"),
        )
        .await
        .unwrap();
    assert_eq!(requested.status, BookingStatus::Requested);

    let approved = flow
        .approve(Some("clinician"), requested.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(approved.status, BookingStatus::Confirmed);

    // The confirmed booking now blocks its interval for everyone involved.
    let err = flow
        .create(
            None,
            &NewBooking::new(ProviderId(1), SubjectId(8), monday(9, 15), monday(9, 45)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Conflict(_)));

    // And the subject cannot be double-booked elsewhere either.
    let err = flow
        .create(
            None,
            &NewBooking::new(ProviderId(2), SubjectId(7), monday(9, 0), monday(9, 30)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Conflict(_)));
}

#[tokio::test]
async fn test_deactivated_window_stops_feeding_suggestions() {
    let repo = RepositoryFactory::create_local();
    let window = availability_admin::create_window(
        repo.as_ref(),
        &NullEventSink,
        Some("admin"),
        &NewAvailabilityWindow::new(ProviderId(1), Weekday::Mon, hm(9, 0), hm(10, 0)),
    )
    .await
    .unwrap();

    let request = FreeSlotRequest::new(ProviderId(1), monday_range(), 30);
    assert_eq!(
        suggest_free_slots(repo.as_ref(), &request).await.unwrap().len(),
        2
    );

    availability_admin::deactivate_window(repo.as_ref(), &NullEventSink, Some("admin"), window.id)
        .await
        .unwrap();

    // "No availability" is a normal outcome, not an error.
    assert!(suggest_free_slots(repo.as_ref(), &request)
        .await
        .unwrap()
        .is_empty());
}
