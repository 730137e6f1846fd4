//! Completed session records
//!
//! A record is written once, when a countdown reaches zero, and never
//! changes afterwards. The only later addition is an optional focus
//! rating for focus sessions, which can be attached exactly once.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::mode::Mode;
use crate::settings::{check_duration, ValidationError};

/// Self-reported focus level for a finished focus session (1-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct FocusRating(u8);

impl FocusRating {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "Very Unfocused",
            2 => "Unfocused",
            3 => "Neutral",
            4 => "Focused",
            _ => "Very Focused",
        }
    }
}

impl TryFrom<i64> for FocusRating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FocusRating> for u8 {
    fn from(rating: FocusRating) -> Self {
        rating.0
    }
}

/// A finished interval, as stored in the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    id: u64,
    #[serde(rename = "date")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "duration", deserialize_with = "minutes")]
    duration_minutes: u32,
    mode: Mode,
    #[serde(
        rename = "focusRating",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    focus_rating: Option<FocusRating>,
}

impl SessionRecord {
    pub fn new(id: u64, timestamp: DateTime<Utc>, duration_minutes: u32, mode: Mode) -> Self {
        Self {
            id,
            timestamp,
            duration_minutes,
            mode,
            focus_rating: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn focus_rating(&self) -> Option<FocusRating> {
        self.focus_rating
    }

    pub fn is_focus(&self) -> bool {
        self.mode == Mode::Focus
    }

    /// Calendar day of the record in the given time zone
    pub fn day_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.timestamp.with_timezone(tz).date_naive()
    }

    /// Calendar day of the record in local time
    pub fn local_day(&self) -> NaiveDate {
        self.day_in(&Local)
    }

    /// Attach a rating; only the session log calls this, and only once
    pub(crate) fn attach_rating(&mut self, rating: FocusRating) {
        self.focus_rating = Some(rating);
    }
}

/// Stored durations must lie within the range settings accept
fn minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = i64::deserialize(deserializer)?;
    check_duration("duration", value).map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rating_bounds() {
        assert!(FocusRating::new(0).is_err());
        assert!(FocusRating::new(6).is_err());
        assert_eq!(FocusRating::new(1).unwrap().label(), "Very Unfocused");
        assert_eq!(FocusRating::new(3).unwrap().label(), "Neutral");
        assert_eq!(FocusRating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_record_wire_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let record = SessionRecord::new(1709285400000, ts, 25, Mode::Focus);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], json!(1709285400000u64));
        assert_eq!(value["duration"], json!(25));
        assert_eq!(value["mode"], json!("focus"));
        assert!(value.get("focusRating").is_none());
    }

    #[test]
    fn test_record_parses_browser_style_blob() {
        let value = json!({
            "id": 1709285400000u64,
            "date": "2024-03-01T09:30:00.000Z",
            "duration": 5,
            "mode": "shortBreak",
            "focusRating": 4,
            "device": "ignored"
        });

        let record: SessionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.mode(), Mode::ShortBreak);
        assert_eq!(record.duration_minutes(), 5);
        assert_eq!(record.focus_rating().map(|r| r.value()), Some(4));
        assert_eq!(record.day_in(&Utc), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_out_of_range_rating_fails_to_parse() {
        let value = json!({
            "id": 1,
            "date": "2024-03-01T09:30:00Z",
            "duration": 25,
            "mode": "focus",
            "focusRating": 9
        });
        assert!(serde_json::from_value::<SessionRecord>(value).is_err());
    }

    #[test]
    fn test_duration_outside_settings_range_fails_to_parse() {
        for duration in [json!(0), json!(-5), json!(1441), json!(4294967295u64)] {
            let value = json!({
                "id": 1,
                "date": "2024-03-01T09:30:00Z",
                "duration": duration,
                "mode": "focus"
            });
            assert!(serde_json::from_value::<SessionRecord>(value).is_err());
        }

        let value = json!({
            "id": 1,
            "date": "2024-03-01T09:30:00Z",
            "duration": 1440,
            "mode": "focus"
        });
        let record: SessionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.duration_minutes(), 1440);
    }
}
