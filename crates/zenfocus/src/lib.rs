//! zenfocus - Pomodoro focus timer with session history
//!
//! "Stay focused. Take a break. Repeat."
//!
//! The core is a single state machine ([`Timer`]) that cycles through
//! focus, short break and long break intervals:
//! - Durations come from user settings, validated as a whole on update
//! - Every finished interval is appended to a persistent session log
//! - Streaks, totals and daily buckets are derived from that log
//! - Audio and rendering subscribe to timer events; they never poll
//!
//! Commands:
//! - tui: Interactive timer (default)
//! - run [--mode MODE]: Run a single interval in the terminal
//! - stats [DAYS]: Show focus statistics
//! - history [DAYS]: List completed sessions
//! - settings: Show or change durations, theme and sound
//! - rate ID RATING: Rate a completed focus session

pub mod audio;
pub mod clock;
pub mod duration;
pub mod mode;
pub mod quotes;
pub mod runtime;
pub mod session;
pub mod session_log;
pub mod settings;
pub mod stats;
pub mod store;
pub mod timer;

pub use clock::{Clock, ManualClock, PollClock};
pub use mode::Mode;
pub use session::{FocusRating, SessionRecord};
pub use session_log::SessionLog;
pub use settings::{Settings, SettingsPatch, SettingsStore, ValidationError};
pub use stats::FocusStats;
pub use store::{FileStore, KeyValueStore, MemoryStore, PersistenceError, SharedStore};
pub use timer::{Timer, TimerEvent, TimerListener, TimerState};
