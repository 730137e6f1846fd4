//! The session state machine
//!
//! Owns the countdown for the current mode, the running flag and the
//! number of focus cycles completed since the process started. Every
//! change goes through one of the commands below or through a clock tick;
//! collaborators learn about changes from [`TimerEvent`]s.
//!
//! ```text
//!            start/pause/reset              start/pause/reset
//!   Focus  ───────── zero ─────────▶  ShortBreak ── zero ──▶ Focus
//!     │    (cycles % interval != 0)
//!     └──────────── zero ─────────▶  LongBreak  ── zero ──▶ Focus
//!          (cycles % interval == 0)
//! ```
//!
//! Reaching zero is atomic: the tick that brings the countdown to zero
//! records the session, switches mode and stops the timer before it
//! returns. The next interval never starts by itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::duration::resolve;
use crate::mode::Mode;
use crate::session::{FocusRating, SessionRecord};
use crate::session_log::{RateError, SessionLog};
use crate::settings::{Settings, SettingsPatch, SettingsStore, ValidationError};

/// Snapshot of the countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: Mode,
    pub seconds_remaining: u32,
    pub is_running: bool,
    /// Focus intervals finished since process start (not persisted)
    pub completed_focus_cycles: u32,
    /// Length the current countdown started from
    pub interval_seconds: u32,
}

impl TimerState {
    fn initial(settings: &Settings) -> Self {
        let seconds = resolve(Mode::Focus, settings);
        Self {
            mode: Mode::Focus,
            seconds_remaining: seconds,
            is_running: false,
            completed_focus_cycles: 0,
            interval_seconds: seconds,
        }
    }

    /// Fraction of the current interval already elapsed, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.interval_seconds == 0 {
            return 1.0;
        }
        let elapsed = self.interval_seconds.saturating_sub(self.seconds_remaining);
        elapsed as f64 / self.interval_seconds as f64
    }

    /// Countdown as MM:SS
    pub fn clock(&self) -> String {
        zenfocus_core::format::clock(self.seconds_remaining)
    }

    /// 1-based position of the current focus block within its long-break
    /// cycle, e.g. "Cycle 2 of 4"
    pub fn cycle_position(&self, long_break_interval: u32) -> u32 {
        self.completed_focus_cycles % long_break_interval.max(1) + 1
    }
}

/// Something that happened to the timer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    Started {
        mode: Mode,
        seconds_remaining: u32,
    },
    Paused {
        mode: Mode,
        seconds_remaining: u32,
    },
    Reset {
        mode: Mode,
        seconds_remaining: u32,
    },
    /// A countdown reached zero; fired exactly once per interval
    Completed {
        record: SessionRecord,
        previous_mode: Mode,
    },
    ModeChanged {
        from: Mode,
        to: Mode,
        seconds_remaining: u32,
    },
    SettingsChanged {
        settings: Settings,
    },
    Rated {
        record: SessionRecord,
    },
}

/// Subscriber to timer events. Called synchronously, in order, on the
/// thread that drives the timer.
pub trait TimerListener: Send {
    fn on_event(&mut self, event: &TimerEvent);
}

impl<F> TimerListener for F
where
    F: FnMut(&TimerEvent) + Send,
{
    fn on_event(&mut self, event: &TimerEvent) {
        self(event)
    }
}

type TimeSource = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Pomodoro state machine
pub struct Timer<C: Clock> {
    state: TimerState,
    settings: SettingsStore,
    log: SessionLog,
    clock: C,
    listeners: Vec<Box<dyn TimerListener>>,
    now: TimeSource,
}

impl<C: Clock> Timer<C> {
    /// A paused timer at the start of a focus interval
    pub fn new(settings: SettingsStore, log: SessionLog, clock: C) -> Self {
        let state = TimerState::initial(settings.get());
        Self {
            state,
            settings,
            log,
            clock,
            listeners: Vec::new(),
            now: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock used to timestamp session records
    pub fn with_time_source<F>(mut self, now: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + 'static,
    {
        self.now = Box::new(now);
        self
    }

    /// Begin in `mode` instead of focus; the cycle count stays at zero
    pub fn starting_in(mut self, mode: Mode) -> Self {
        self.state.mode = mode;
        self.rewind();
        self
    }

    pub fn subscribe<L: TimerListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Start or resume the countdown
    pub fn start(&mut self) {
        if self.state.seconds_remaining == 0 {
            // Zero is terminal: finish the interval instead of restarting it
            self.complete();
            return;
        }
        if self.state.is_running {
            return;
        }

        self.state.is_running = true;
        self.clock.arm();
        debug!(
            "Started {} with {}s remaining",
            self.state.mode.as_str(),
            self.state.seconds_remaining
        );
        self.emit(TimerEvent::Started {
            mode: self.state.mode,
            seconds_remaining: self.state.seconds_remaining,
        });
    }

    /// Stop the countdown where it is
    pub fn pause(&mut self) {
        self.clock.disarm();
        if !self.state.is_running {
            return;
        }

        self.state.is_running = false;
        debug!(
            "Paused {} at {}s",
            self.state.mode.as_str(),
            self.state.seconds_remaining
        );
        self.emit(TimerEvent::Paused {
            mode: self.state.mode,
            seconds_remaining: self.state.seconds_remaining,
        });
    }

    /// Start when paused, pause when running
    pub fn toggle(&mut self) {
        if self.state.is_running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Stop and rewind the current mode to its full length
    pub fn reset(&mut self) {
        self.clock.disarm();
        self.state.is_running = false;
        self.rewind();
        debug!("Reset {} to {}s", self.state.mode.as_str(), self.state.seconds_remaining);
        self.emit(TimerEvent::Reset {
            mode: self.state.mode,
            seconds_remaining: self.state.seconds_remaining,
        });
    }

    /// Advance the countdown by one second. Returns the session record
    /// when this tick finished the interval.
    pub fn tick(&mut self) -> Option<SessionRecord> {
        if !self.state.is_running || self.state.seconds_remaining == 0 {
            // Stale tick from a clock that was just disarmed
            return None;
        }

        self.state.seconds_remaining -= 1;
        trace!("Tick: {}s remaining", self.state.seconds_remaining);

        if self.state.seconds_remaining == 0 {
            Some(self.complete())
        } else {
            None
        }
    }

    /// Validate, persist and apply a partial settings update
    ///
    /// An idle timer picks up a changed duration for its mode immediately;
    /// a running countdown keeps going until the next reset or mode change.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Settings, ValidationError> {
        let mode = self.state.mode;
        let before = resolve(mode, self.settings.get());
        let settings = self.settings.update(patch)?;
        let after = resolve(mode, &settings);

        if !self.state.is_running && before != after {
            self.rewind();
            debug!("Idle {} countdown now {}s", mode.as_str(), after);
        }

        self.emit(TimerEvent::SettingsChanged {
            settings: settings.clone(),
        });
        Ok(settings)
    }

    /// Attach a focus rating to a completed focus session
    pub fn rate(&mut self, id: u64, rating: FocusRating) -> Result<SessionRecord, RateError> {
        let record = self.log.rate(id, rating)?.clone();
        self.flush_log();
        self.emit(TimerEvent::Rated {
            record: record.clone(),
        });
        Ok(record)
    }

    fn complete(&mut self) -> SessionRecord {
        self.clock.disarm();
        self.state.is_running = false;

        let previous = self.state.mode;
        let minutes = resolve(previous, self.settings.get()) / 60;
        let record = self.log.record((self.now)(), minutes, previous);
        self.flush_log();

        let next = match previous {
            Mode::Focus => {
                self.state.completed_focus_cycles += 1;
                let interval = self.settings.get().long_break_interval.max(1);
                if self.state.completed_focus_cycles % interval == 0 {
                    Mode::LongBreak
                } else {
                    Mode::ShortBreak
                }
            }
            Mode::ShortBreak | Mode::LongBreak => Mode::Focus,
        };

        self.state.mode = next;
        self.rewind();

        info!(
            "Completed {} ({} min), next: {}",
            previous.as_str(),
            minutes,
            next.as_str()
        );

        self.emit(TimerEvent::Completed {
            record: record.clone(),
            previous_mode: previous,
        });
        self.emit(TimerEvent::ModeChanged {
            from: previous,
            to: next,
            seconds_remaining: self.state.seconds_remaining,
        });

        record
    }

    fn rewind(&mut self) {
        let seconds = resolve(self.state.mode, self.settings.get());
        self.state.seconds_remaining = seconds;
        self.state.interval_seconds = seconds;
    }

    fn flush_log(&self) {
        if let Err(e) = self.log.flush() {
            warn!("Failed to persist session log, keeping it in memory: {}", e);
        }
    }

    fn emit(&mut self, event: TimerEvent) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }
}
