//! Slot generation and free-slot suggestion.
//!
//! The slot generator expands a provider's recurring weekly availability
//! into concrete, dated, fixed-length candidate intervals within a
//! requested range. It knows nothing about bookings; the free-slot service
//! composes it with the conflict checker and keeps only candidates that
//! come back clean.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::conflicts::ConflictQuery;
use super::error::{SchedulingError, SchedulingResult};
use crate::api::{BookingId, ProviderId, SubjectId};
use crate::db::repository::{AvailabilityRepository, BookingRepository, FullRepository};
use crate::models::{AvailabilityWindow, TimeInterval};

/// Default cap on suggested slots per request.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 50;

/// Parameters for candidate slot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotQuery {
    pub provider_id: ProviderId,
    /// Half-open `[range_start, range_end)` bounds; windows are clipped to
    /// this range.
    pub range: TimeInterval,
    pub duration_minutes: i64,
    /// Walk increment; defaults to each window's configured `slot_minutes`.
    pub step_minutes: Option<i64>,
}

impl SlotQuery {
    pub fn new(provider_id: ProviderId, range: TimeInterval, duration_minutes: i64) -> Self {
        Self {
            provider_id,
            range,
            duration_minutes,
            step_minutes: None,
        }
    }

    pub fn with_step_minutes(mut self, step_minutes: i64) -> Self {
        self.step_minutes = Some(step_minutes);
        self
    }
}

/// Lazy, finite, restartable sequence of candidate `[start, end)` slots.
///
/// Candidates are produced date-ascending, then time-ascending within a
/// date, then window-ascending when several windows cover the same day.
/// Overlapping windows are not merged or de-duplicated. No conflict
/// checking happens here.
#[derive(Debug, Clone)]
pub struct CandidateSlots {
    // Active windows sorted by (weekday, start_time, end_time, id)
    windows: Vec<AvailabilityWindow>,
    range: TimeInterval,
    duration: Duration,
    step_override: Option<Duration>,

    // Cursor state
    current_date: NaiveDate,
    last_date: NaiveDate,
    window_idx: usize,
    cursor: Option<chrono::DateTime<chrono::Utc>>,
    window_end: chrono::DateTime<chrono::Utc>,
    step: Duration,
    done: bool,
}

impl CandidateSlots {
    /// Build a generator from a provider's windows.
    ///
    /// A non-positive duration or step override is a caller error. An empty
    /// or inverted range, or no usable windows, yields an empty sequence
    /// rather than an error.
    pub fn new(windows: &[AvailabilityWindow], query: &SlotQuery) -> SchedulingResult<Self> {
        if query.duration_minutes <= 0 {
            return Err(SchedulingError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }
        if let Some(step) = query.step_minutes {
            if step <= 0 {
                return Err(SchedulingError::Validation(
                    "step_minutes must be positive".to_string(),
                ));
            }
        }

        let mut windows: Vec<AvailabilityWindow> = windows
            .iter()
            .filter(|w| w.is_active && w.is_well_formed())
            .cloned()
            .collect();
        windows.sort_by_key(|w| {
            (
                w.weekday.num_days_from_monday(),
                w.start_time,
                w.end_time,
                w.id,
            )
        });

        let done = !query.range.is_well_formed() || windows.is_empty();
        Ok(Self {
            windows,
            range: query.range,
            duration: Duration::minutes(query.duration_minutes),
            step_override: query.step_minutes.map(Duration::minutes),
            current_date: query.range.start.date_naive(),
            last_date: query.range.end.date_naive(),
            window_idx: 0,
            cursor: None,
            window_end: query.range.start,
            step: Duration::zero(),
            done,
        })
    }

    /// Position the cursor at the start of the next non-empty clipped
    /// window, walking dates forward; marks the sequence done when the
    /// range is exhausted.
    fn advance(&mut self) {
        loop {
            let weekday = self.current_date.weekday();
            while self.window_idx < self.windows.len() {
                let window = &self.windows[self.window_idx];
                self.window_idx += 1;
                if window.weekday != weekday {
                    continue;
                }

                let win_start = self.current_date.and_time(window.start_time).and_utc();
                let win_end = self.current_date.and_time(window.end_time).and_utc();
                // Clamp to the requested range
                let clipped_start = win_start.max(self.range.start);
                let clipped_end = win_end.min(self.range.end);
                if clipped_start >= clipped_end {
                    continue;
                }

                let step = self
                    .step_override
                    .unwrap_or_else(|| Duration::minutes(i64::from(window.slot_minutes)));
                if step <= Duration::zero() {
                    continue;
                }

                self.cursor = Some(clipped_start);
                self.window_end = clipped_end;
                self.step = step;
                return;
            }

            self.window_idx = 0;
            match self.current_date.succ_opt() {
                Some(next) if next <= self.last_date => self.current_date = next,
                _ => {
                    self.done = true;
                    return;
                }
            }
        }
    }
}

impl Iterator for CandidateSlots {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<TimeInterval> {
        while !self.done {
            if let Some(cursor) = self.cursor {
                if cursor + self.duration <= self.window_end {
                    self.cursor = Some(cursor + self.step);
                    return Some(TimeInterval::new(cursor, cursor + self.duration));
                }
                self.cursor = None;
            }
            self.advance();
        }
        None
    }
}

/// A bookable, conflict-free slot ready for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: i64,
    pub provider_id: ProviderId,
}

/// Parameters for the composed free-slot read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlotRequest {
    pub provider_id: ProviderId,
    pub range: TimeInterval,
    pub duration_minutes: i64,
    pub step_minutes: Option<i64>,
    /// When present, slots that would double-book the subject elsewhere are
    /// filtered out too.
    pub subject_id: Option<SubjectId>,
    /// Ignore this booking when checking conflicts (reschedule flows).
    pub exclude_booking: Option<BookingId>,
    pub limit: usize,
}

impl FreeSlotRequest {
    pub fn new(provider_id: ProviderId, range: TimeInterval, duration_minutes: i64) -> Self {
        Self {
            provider_id,
            range,
            duration_minutes,
            step_minutes: None,
            subject_id: None,
            exclude_booking: None,
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    pub fn with_step_minutes(mut self, step_minutes: i64) -> Self {
        self.step_minutes = Some(step_minutes);
        self
    }

    pub fn for_subject(mut self, subject_id: SubjectId) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    pub fn excluding_booking(mut self, booking_id: BookingId) -> Self {
        self.exclude_booking = Some(booking_id);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Suggest bookable slots: generate candidates in order, drop those with
/// conflicts, stop at `limit`.
///
/// "No availability" is a normal outcome: an empty or inverted range, a
/// non-positive duration, or a provider without active windows all return
/// an empty list rather than an error.
pub async fn suggest_free_slots(
    repo: &dyn FullRepository,
    request: &FreeSlotRequest,
) -> SchedulingResult<Vec<FreeSlot>> {
    if request.duration_minutes <= 0
        || !request.range.is_well_formed()
        || request.limit == 0
    {
        return Ok(Vec::new());
    }

    let windows = repo.active_windows(request.provider_id).await?;
    if windows.is_empty() {
        return Ok(Vec::new());
    }

    let query = SlotQuery {
        provider_id: request.provider_id,
        range: request.range,
        duration_minutes: request.duration_minutes,
        step_minutes: request.step_minutes,
    };
    let candidates = CandidateSlots::new(&windows, &query)?;

    let mut slots = Vec::new();
    for candidate in candidates {
        let conflict_query = ConflictQuery::new(request.provider_id, candidate)
            .with_subject_opt(request.subject_id)
            .excluding_opt(request.exclude_booking);
        let conflicts = repo.find_conflicts(&conflict_query).await?;
        if conflicts.is_empty() {
            slots.push(FreeSlot {
                start: candidate.start,
                end: candidate.end,
                duration_minutes: request.duration_minutes,
                provider_id: request.provider_id,
            });
            // Short-circuit once the cap is reached
            if slots.len() >= request.limit {
                break;
            }
        }
    }

    Ok(slots)
}

#[cfg(test)]
#[path = "slots_tests.rs"]
mod tests;
