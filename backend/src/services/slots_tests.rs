use chrono::{Duration, NaiveTime, TimeZone, Utc, Weekday};
use proptest::prelude::*;

use super::{suggest_free_slots, CandidateSlots, FreeSlotRequest, SlotQuery};
use crate::api::{ProviderId, SubjectId, WindowId};
use crate::db::repository::{AvailabilityRepository, BookingRepository};
use crate::db::LocalRepository;
use crate::models::{AvailabilityWindow, NewAvailabilityWindow, NewBooking, TimeInterval};
use crate::services::error::SchedulingError;

// 2025-03-10 is a Monday.
fn monday(h: u32, m: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

fn day_range(day: u32) -> TimeInterval {
    TimeInterval::new(
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, day + 1, 0, 0, 0).unwrap(),
    )
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn mk_window(
    id: i64,
    weekday: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    slot_minutes: u32,
) -> AvailabilityWindow {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    AvailabilityWindow {
        id: WindowId(id),
        provider_id: ProviderId(1),
        weekday,
        start_time: start,
        end_time: end,
        slot_minutes,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn collect(windows: &[AvailabilityWindow], query: &SlotQuery) -> Vec<TimeInterval> {
    CandidateSlots::new(windows, query).unwrap().collect()
}

#[test]
fn test_basic_generation_two_slots() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    let query = SlotQuery::new(ProviderId(1), day_range(10), 30);

    let slots = collect(&windows, &query);
    assert_eq!(
        slots,
        vec![
            TimeInterval::new(monday(9, 0), monday(9, 30)),
            TimeInterval::new(monday(9, 30), monday(10, 0)),
        ]
    );
}

#[test]
fn test_duration_longer_than_window_yields_nothing() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    let query = SlotQuery::new(ProviderId(1), day_range(10), 90);
    assert!(collect(&windows, &query).is_empty());
}

#[test]
fn test_window_outside_range_yields_nothing() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    // 2025-03-11 is a Tuesday
    let query = SlotQuery::new(ProviderId(1), day_range(11), 30);
    assert!(collect(&windows, &query).is_empty());
}

#[test]
fn test_window_clipped_to_range_start() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    let range = TimeInterval::new(monday(9, 15), monday(23, 0));
    let query = SlotQuery::new(ProviderId(1), range, 30);

    // Walking starts at the clipped start, not the window start.
    let slots = collect(&windows, &query);
    assert_eq!(slots, vec![TimeInterval::new(monday(9, 15), monday(9, 45))]);
}

#[test]
fn test_window_clipped_to_range_end() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    let range = TimeInterval::new(monday(0, 0), monday(9, 45));
    let query = SlotQuery::new(ProviderId(1), range, 30);

    let slots = collect(&windows, &query);
    assert_eq!(slots, vec![TimeInterval::new(monday(9, 0), monday(9, 30))]);
}

#[test]
fn test_overlapping_windows_not_merged() {
    let windows = [
        mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30),
        mk_window(2, Weekday::Mon, hm(9, 30), hm(10, 30), 30),
    ];
    let query = SlotQuery::new(ProviderId(1), day_range(10), 30);

    // Window-by-window, no de-duplication: both windows contribute their
    // own walk even where they overlap.
    let slots = collect(&windows, &query);
    assert_eq!(
        slots,
        vec![
            TimeInterval::new(monday(9, 0), monday(9, 30)),
            TimeInterval::new(monday(9, 30), monday(10, 0)),
            TimeInterval::new(monday(9, 30), monday(10, 0)),
            TimeInterval::new(monday(10, 0), monday(10, 30)),
        ]
    );
}

#[test]
fn test_recurrence_across_weeks() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 60)];
    let range = TimeInterval::new(
        Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap(),
    );
    let query = SlotQuery::new(ProviderId(1), range, 60);

    // Two Mondays in range: 2025-03-10 and 2025-03-17, date-ascending.
    let slots = collect(&windows, &query);
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start, monday(9, 0));
    assert_eq!(
        slots[1].start,
        Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap()
    );
}

#[test]
fn test_step_override() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    let query = SlotQuery::new(ProviderId(1), day_range(10), 30).with_step_minutes(15);

    let starts: Vec<_> = collect(&windows, &query)
        .into_iter()
        .map(|s| s.start)
        .collect();
    assert_eq!(starts, vec![monday(9, 0), monday(9, 15), monday(9, 30)]);
}

#[test]
fn test_inactive_and_malformed_windows_skipped() {
    let mut inactive = mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30);
    inactive.is_active = false;
    let mut inverted = mk_window(2, Weekday::Mon, hm(12, 0), hm(11, 0), 30);
    inverted.is_active = true;

    let query = SlotQuery::new(ProviderId(1), day_range(10), 30);
    assert!(collect(&[inactive, inverted], &query).is_empty());
}

#[test]
fn test_non_positive_duration_is_caller_error() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(10, 0), 30)];
    for duration in [0, -30] {
        let query = SlotQuery::new(ProviderId(1), day_range(10), duration);
        let err = CandidateSlots::new(&windows, &query).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }
}

#[test]
fn test_generator_is_restartable() {
    let windows = [mk_window(1, Weekday::Mon, hm(9, 0), hm(12, 0), 30)];
    let query = SlotQuery::new(ProviderId(1), day_range(10), 30);

    let generator = CandidateSlots::new(&windows, &query).unwrap();
    let first: Vec<_> = generator.clone().collect();
    let second: Vec<_> = generator.collect();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

proptest! {
    #[test]
    fn prop_window_fitting_duration_produces_a_slot(
        start_min in 0u32..720,
        len_min in 30u32..240,
        slot_minutes in 5u32..60,
    ) {
        let start = hm(6, 0) + Duration::minutes(i64::from(start_min));
        let end = start + Duration::minutes(i64::from(len_min));
        let windows = [mk_window(1, Weekday::Mon, start, end, slot_minutes)];

        // Any duration no longer than the window must yield at least one
        // candidate inside a range covering one Monday.
        let duration = i64::from(len_min.min(60));
        let query = SlotQuery::new(ProviderId(1), day_range(10), duration);
        let slots = collect(&windows, &query);
        prop_assert!(!slots.is_empty());
    }

    #[test]
    fn prop_candidates_stay_inside_window_and_range(
        start_min in 0u32..720,
        len_min in 30u32..240,
        duration in 10i64..90,
        step in 5i64..45,
    ) {
        let win_start = hm(6, 0) + Duration::minutes(i64::from(start_min));
        let win_end = win_start + Duration::minutes(i64::from(len_min));
        let windows = [mk_window(1, Weekday::Mon, win_start, win_end, 30)];

        let range = day_range(10);
        let query = SlotQuery::new(ProviderId(1), range, duration).with_step_minutes(step);
        for slot in collect(&windows, &query) {
            prop_assert!(slot.start >= range.start && slot.end <= range.end);
            let concrete_start = monday(0, 0) + (win_start - hm(0, 0));
            let concrete_end = monday(0, 0) + (win_end - hm(0, 0));
            prop_assert!(slot.start >= concrete_start);
            prop_assert!(slot.end <= concrete_end);
            prop_assert_eq!(slot.duration_minutes(), duration);
        }
    }
}

// ---- Free-slot service over the in-memory repository ----

async fn repo_with_monday_window() -> LocalRepository {
    let repo = LocalRepository::new();
    repo.create_window(
        &NewAvailabilityWindow::new(ProviderId(1), Weekday::Mon, hm(9, 0), hm(10, 0))
            .with_slot_minutes(30),
    )
    .await
    .unwrap();
    repo
}

#[tokio::test]
async fn test_suggest_basic_two_slots() {
    let repo = repo_with_monday_window().await;
    let request = FreeSlotRequest::new(ProviderId(1), day_range(10), 30);

    let slots = suggest_free_slots(&repo, &request).await.unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start, monday(9, 0));
    assert_eq!(slots[0].end, monday(9, 30));
    assert_eq!(slots[1].start, monday(9, 30));
    assert_eq!(slots[0].duration_minutes, 30);
    assert_eq!(slots[0].provider_id, ProviderId(1));
}

#[tokio::test]
async fn test_suggest_skips_booked_slot() {
    let repo = repo_with_monday_window().await;
    repo.insert_booking(&NewBooking::new(
        ProviderId(1),
        SubjectId(10),
        monday(9, 0),
        monday(9, 30),
    ))
    .await
    .unwrap();

    let request = FreeSlotRequest::new(ProviderId(1), day_range(10), 30);
    let slots = suggest_free_slots(&repo, &request).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, monday(9, 30));
}

#[tokio::test]
async fn test_suggest_respects_limit() {
    let repo = repo_with_monday_window().await;
    let request = FreeSlotRequest::new(ProviderId(1), day_range(10), 30).with_limit(1);

    let slots = suggest_free_slots(&repo, &request).await.unwrap();
    assert_eq!(slots.len(), 1);
}

#[tokio::test]
async fn test_suggest_is_idempotent() {
    let repo = repo_with_monday_window().await;
    let request = FreeSlotRequest::new(ProviderId(1), day_range(10), 30);

    let first = suggest_free_slots(&repo, &request).await.unwrap();
    let second = suggest_free_slots(&repo, &request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_suggest_empty_outcomes_are_not_errors() {
    let repo = repo_with_monday_window().await;

    // Non-positive duration
    let request = FreeSlotRequest::new(ProviderId(1), day_range(10), 0);
    assert!(suggest_free_slots(&repo, &request).await.unwrap().is_empty());

    // Inverted range
    let inverted = TimeInterval::new(monday(10, 0), monday(9, 0));
    let request = FreeSlotRequest::new(ProviderId(1), inverted, 30);
    assert!(suggest_free_slots(&repo, &request).await.unwrap().is_empty());

    // Provider without windows
    let request = FreeSlotRequest::new(ProviderId(99), day_range(10), 30);
    assert!(suggest_free_slots(&repo, &request).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_suggest_excludes_subjects_own_conflicts() {
    let repo = repo_with_monday_window().await;
    // The subject is busy elsewhere 09:00-09:30 with a different provider.
    repo.insert_booking(&NewBooking::new(
        ProviderId(2),
        SubjectId(10),
        monday(9, 0),
        monday(9, 30),
    ))
    .await
    .unwrap();

    let without_subject = FreeSlotRequest::new(ProviderId(1), day_range(10), 30);
    assert_eq!(
        suggest_free_slots(&repo, &without_subject).await.unwrap().len(),
        2
    );

    let with_subject = without_subject.for_subject(SubjectId(10));
    let slots = suggest_free_slots(&repo, &with_subject).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, monday(9, 30));
}
