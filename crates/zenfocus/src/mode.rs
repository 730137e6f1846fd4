//! Timer modes
//!
//! The interval type the timer is currently counting down: a focus
//! block or one of the two break lengths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The interval type being counted down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Focused work, counted toward the long-break interval
    #[default]
    Focus,
    /// Short recovery between focus blocks
    ShortBreak,
    /// Longer recovery after every `longBreakInterval` focus blocks
    LongBreak,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Focus, Mode::ShortBreak, Mode::LongBreak];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Focus => "focus",
            Mode::ShortBreak => "shortBreak",
            Mode::LongBreak => "longBreak",
        }
    }

    /// Parse a mode name, accepting both camelCase and kebab-case spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "focus" => Some(Mode::Focus),
            "shortbreak" | "short" => Some(Mode::ShortBreak),
            "longbreak" | "long" => Some(Mode::LongBreak),
            _ => None,
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Mode::Focus)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Focus => "Focus",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }

    /// Heading shown above the countdown
    pub fn headline(&self) -> &'static str {
        match self {
            Mode::Focus => "Stay Focused",
            Mode::ShortBreak => "Take a Short Break",
            Mode::LongBreak => "Take a Long Break",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_accepts_cli_spellings() {
        assert_eq!(Mode::parse("focus"), Some(Mode::Focus));
        assert_eq!(Mode::parse("short-break"), Some(Mode::ShortBreak));
        assert_eq!(Mode::parse("shortBreak"), Some(Mode::ShortBreak));
        assert_eq!(Mode::parse("long_break"), Some(Mode::LongBreak));
        assert_eq!(Mode::parse("nap"), None);
    }

    #[test]
    fn test_mode_serializes_camel_case() {
        let json = serde_json::to_string(&Mode::ShortBreak).unwrap();
        assert_eq!(json, "\"shortBreak\"");
        let mode: Mode = serde_json::from_str("\"longBreak\"").unwrap();
        assert_eq!(mode, Mode::LongBreak);
    }

    #[test]
    fn test_only_focus_is_not_a_break() {
        assert!(!Mode::Focus.is_break());
        assert!(Mode::ShortBreak.is_break());
        assert!(Mode::LongBreak.is_break());
    }
}
