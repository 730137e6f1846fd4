//! Formatting utilities

use chrono::{DateTime, Local, Utc};

/// Format a countdown as MM:SS
///
/// Minutes are not wrapped into hours, so a 90 minute interval
/// reads `90:00`.
pub fn clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format a minute total as "Xh Ym"
pub fn hours_minutes(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Format a duration in human-readable form
pub fn duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Format a timestamp as local "YYYY-MM-DD HH:MM"
pub fn timestamp(dt: DateTime<Utc>) -> String {
    let local: DateTime<Local> = dt.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Render a fractional progress (0.0-1.0) as a block bar of `width` cells
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_pads_both_fields() {
        assert_eq!(clock(1500), "25:00");
        assert_eq!(clock(61), "01:01");
        assert_eq!(clock(0), "00:00");
        assert_eq!(clock(90 * 60), "90:00");
    }

    #[test]
    fn test_hours_minutes() {
        assert_eq!(hours_minutes(135), "2h 15m");
        assert_eq!(hours_minutes(0), "0h 0m");
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(42), "42s");
        assert_eq!(duration(125), "2m 5s");
        assert_eq!(duration(3720), "1h 2m");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "\u{2591}\u{2591}\u{2591}\u{2591}");
        assert_eq!(progress_bar(0.5, 4), "\u{2588}\u{2588}\u{2591}\u{2591}");
        assert_eq!(progress_bar(2.0, 4), "\u{2588}\u{2588}\u{2588}\u{2588}");
    }
}
