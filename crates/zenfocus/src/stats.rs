//! Focus statistics calculation
//!
//! Aggregates the session log into useful statistics:
//! - Streak of consecutive days with focus time
//! - Total focus time and session counts
//! - Per-day focus minutes over a trailing window
//!
//! Everything is computed on demand from the records. Calendar days are
//! taken in a caller-supplied time zone; the `SessionLog` helpers use local
//! time.

use chrono::{Datelike, Days, Local, NaiveDate, TimeZone};
use std::collections::{BTreeSet, HashMap};

use crate::session::SessionRecord;
use crate::session_log::SessionLog;

/// Trailing window for the weekly bar chart
pub const WEEK_WINDOW: u32 = 7;

/// Trailing window for the activity calendar
pub const CALENDAR_WINDOW: u32 = 90;

/// Aggregated focus statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusStats {
    /// Number of focus sessions
    pub focus_sessions: u32,
    /// Number of break sessions (short and long)
    pub break_sessions: u32,
    /// Total focus time in minutes
    pub total_minutes: u32,
    /// Consecutive days with focus time, ending today or yesterday
    pub streak: u32,
    /// Mean focus rating over rated sessions
    pub average_rating: Option<f32>,
}

impl FocusStats {
    /// Calculate statistics from session records
    pub fn from_records<Tz: TimeZone>(records: &[SessionRecord], today: NaiveDate, tz: &Tz) -> Self {
        let focus_sessions = records.iter().filter(|r| r.is_focus()).count() as u32;
        let break_sessions = records.iter().filter(|r| r.mode().is_break()).count() as u32;

        let ratings: Vec<u32> = records
            .iter()
            .filter_map(|r| r.focus_rating())
            .map(|r| r.value() as u32)
            .collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<u32>() as f32 / ratings.len() as f32)
        };

        Self {
            focus_sessions,
            break_sessions,
            total_minutes: total_focus_minutes(records),
            streak: streak(records, today, tz),
            average_rating,
        }
    }

    /// Get total hours and minutes as a tuple
    pub fn total_time(&self) -> (u32, u32) {
        (self.total_minutes / 60, self.total_minutes % 60)
    }
}

/// Sum of focus minutes across `records`, saturating at `u32::MAX`
pub fn total_focus_minutes<'a>(records: impl IntoIterator<Item = &'a SessionRecord>) -> u32 {
    records
        .into_iter()
        .filter(|r| r.is_focus())
        .fold(0u32, |total, r| total.saturating_add(r.duration_minutes()))
}

/// Consecutive calendar days with at least one focus session, walking
/// back from `today`. A today without focus time yet does not break the
/// streak; the walk then starts at yesterday.
pub fn streak<Tz: TimeZone>(records: &[SessionRecord], today: NaiveDate, tz: &Tz) -> u32 {
    let days: BTreeSet<NaiveDate> = records
        .iter()
        .filter(|r| r.is_focus())
        .map(|r| r.day_in(tz))
        .collect();

    let mut day = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut count = 0;
    while let Some(d) = day.filter(|d| days.contains(d)) {
        count += 1;
        day = d.pred_opt();
    }
    count
}

/// Focus minutes on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub minutes: u32,
}

impl DailyFocus {
    pub fn level(&self) -> ActivityLevel {
        ActivityLevel::from_minutes(self.minutes)
    }
}

/// Per-day focus minutes for the `window` days ending at `today`, oldest
/// first, with zero for days without focus time
pub fn daily_focus<Tz: TimeZone>(
    records: &[SessionRecord],
    today: NaiveDate,
    window: u32,
    tz: &Tz,
) -> Vec<DailyFocus> {
    let mut minutes: HashMap<NaiveDate, u32> = HashMap::new();
    for record in records.iter().filter(|r| r.is_focus()) {
        let total = minutes.entry(record.day_in(tz)).or_insert(0);
        *total = total.saturating_add(record.duration_minutes());
    }

    (0..window)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
        .map(|date| DailyFocus {
            date,
            minutes: minutes.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Shading bucket for a day in the activity calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActivityLevel {
    None,
    Light,
    Moderate,
    Solid,
    Strong,
    Peak,
}

impl ActivityLevel {
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0 => ActivityLevel::None,
            1..=29 => ActivityLevel::Light,
            30..=59 => ActivityLevel::Moderate,
            60..=89 => ActivityLevel::Solid,
            90..=119 => ActivityLevel::Strong,
            _ => ActivityLevel::Peak,
        }
    }

    /// Single-cell glyph for terminal heat maps
    pub fn glyph(&self) -> char {
        match self {
            ActivityLevel::None => '\u{00b7}',
            ActivityLevel::Light => '\u{2591}',
            ActivityLevel::Moderate => '\u{2592}',
            ActivityLevel::Solid => '\u{2593}',
            ActivityLevel::Strong => '\u{2588}',
            ActivityLevel::Peak => '\u{25a0}',
        }
    }
}

/// One Sunday-to-Saturday column of the activity calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityWeek {
    /// The Sunday starting this week
    pub start: NaiveDate,
    /// Minutes per weekday (Sunday first); `None` outside the window
    pub days: [Option<u32>; 7],
}

/// Group daily buckets into calendar weeks starting on Sunday
pub fn activity_weeks(days: &[DailyFocus]) -> Vec<ActivityWeek> {
    let mut weeks: Vec<ActivityWeek> = Vec::new();

    for day in days {
        let offset = day.date.weekday().num_days_from_sunday();
        let Some(start) = day.date.checked_sub_days(Days::new(offset as u64)) else {
            continue;
        };

        if weeks.last().map(|w| w.start) != Some(start) {
            weeks.push(ActivityWeek {
                start,
                days: [None; 7],
            });
        }
        if let Some(week) = weeks.last_mut() {
            week.days[offset as usize] = Some(day.minutes);
        }
    }

    weeks
}

impl SessionLog {
    /// Statistics as of today, in local time
    pub fn stats(&self) -> FocusStats {
        FocusStats::from_records(self.records(), Local::now().date_naive(), &Local)
    }

    /// Daily focus minutes for the trailing `window` days, in local time
    pub fn daily_focus(&self, window: u32) -> Vec<DailyFocus> {
        daily_focus(self.records(), Local::now().date_naive(), window, &Local)
    }
}
