//! Recurring weekly availability for a provider.
//!
//! A window says "this provider can be booked on this weekday between these
//! times of day, in slots of this granularity". Windows carry no date; the
//! slot generator projects them onto concrete dates. Windows are
//! soft-disabled via `is_active` rather than deleted so past generated slots
//! remain explainable.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::api::{ProviderId, WindowId};

/// Map a 0–6 index (Monday = 0, matching the wire and storage format) to a
/// weekday.
pub fn weekday_from_number(n: u8) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Inverse of [`weekday_from_number`].
pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

/// Serde adapter serializing a weekday as its 0–6 index, Monday = 0.
pub mod weekday_num {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(super::weekday_number(*weekday))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let n = u8::deserialize(deserializer)?;
        super::weekday_from_number(n)
            .ok_or_else(|| de::Error::custom(format!("weekday must be 0-6 (Monday=0), got {}", n)))
    }
}

/// A recurring weekly availability window.
/// Example: Monday 09:00–17:00 with 30-minute slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: WindowId,
    pub provider_id: ProviderId,
    #[serde(with = "weekday_num")]
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Default slot size for suggestions; callers can override per request.
    pub slot_minutes: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    /// Invariant: `end_time > start_time`.
    pub fn is_well_formed(&self) -> bool {
        self.end_time > self.start_time
    }
}

impl std::fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{} {}-{} ({}m)",
            self.provider_id, self.weekday, self.start_time, self.end_time, self.slot_minutes
        )
    }
}

/// Input for creating an availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAvailabilityWindow {
    pub provider_id: ProviderId,
    #[serde(with = "weekday_num")]
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

fn default_slot_minutes() -> u32 {
    30
}

impl NewAvailabilityWindow {
    pub fn new(
        provider_id: ProviderId,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            provider_id,
            weekday,
            start_time,
            end_time,
            slot_minutes: default_slot_minutes(),
        }
    }

    pub fn with_slot_minutes(mut self, slot_minutes: u32) -> Self {
        self.slot_minutes = slot_minutes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_weekday_numbering_round_trip() {
        for n in 0u8..7 {
            let weekday = weekday_from_number(n).unwrap();
            assert_eq!(weekday_number(weekday), n);
        }
        assert_eq!(weekday_from_number(7), None);
    }

    #[test]
    fn test_monday_is_zero() {
        assert_eq!(weekday_from_number(0), Some(Weekday::Mon));
        assert_eq!(weekday_from_number(6), Some(Weekday::Sun));
    }

    #[test]
    fn test_new_window_serde_weekday_as_number() {
        let window = NewAvailabilityWindow::new(
            crate::api::ProviderId(7),
            Weekday::Wed,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(json["weekday"], 2);

        let parsed: NewAvailabilityWindow = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.weekday, Weekday::Wed);
        assert_eq!(parsed.slot_minutes, 30);
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        let json = serde_json::json!({
            "provider_id": 1,
            "weekday": 9,
            "start_time": "09:00:00",
            "end_time": "10:00:00",
        });
        assert!(serde_json::from_value::<NewAvailabilityWindow>(json).is_err());
    }
}
