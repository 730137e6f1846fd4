//! Tick sources
//!
//! The timer never schedules anything itself. It owns a [`Clock`] that it
//! arms on start and disarms on pause, reset and completion; whoever hosts
//! the timer asks the clock when the next tick is due and calls
//! [`Timer::tick`](crate::timer::Timer::tick).
//!
//! - [`ManualClock`]: no wall clock at all, ticks are fed by hand (tests,
//!   embedding in another event loop)
//! - [`PollClock`]: deadline-based, for a synchronous UI loop that polls
//! - [`IntervalClock`](crate::runtime::IntervalClock): tokio interval, used
//!   by the async driver

use std::time::{Duration, Instant};

/// One tick per second while armed
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Arm/disarm capability the timer drives
pub trait Clock {
    /// Begin producing ticks; a no-op when already armed
    fn arm(&mut self);

    /// Stop producing ticks immediately, dropping any pending one
    fn disarm(&mut self);

    fn is_armed(&self) -> bool;
}

/// Clock with no time source; it only records whether it is armed
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    armed: bool,
    arm_count: u32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the clock went from disarmed to armed
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }
}

impl Clock for ManualClock {
    fn arm(&mut self) {
        if !self.armed {
            self.armed = true;
            self.arm_count += 1;
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Deadline clock for a polling loop
///
/// Missed seconds are not caught up: if the loop falls behind by more than
/// a period (machine asleep, terminal suspended) the next deadline is
/// simply one period from now.
#[derive(Debug, Clone)]
pub struct PollClock {
    period: Duration,
    next: Option<Instant>,
}

impl Default for PollClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PollClock {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Consume the pending tick if its deadline has passed
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                let following = next + self.period;
                self.next = Some(if following > now {
                    following
                } else {
                    now + self.period
                });
                true
            }
            _ => false,
        }
    }

    /// Time left until the next tick, `None` while disarmed
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.next.map(|next| next.saturating_duration_since(now))
    }
}

impl Clock for PollClock {
    fn arm(&mut self) {
        if self.next.is_none() {
            self.next = Some(Instant::now() + self.period);
        }
    }

    fn disarm(&mut self) {
        self.next = None;
    }

    fn is_armed(&self) -> bool {
        self.next.is_some()
    }
}
