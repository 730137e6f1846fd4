//! Async driver for the timer
//!
//! The timer lives on a single tokio task. Commands arrive over an mpsc
//! queue and are applied one at a time, interleaved with clock ticks, so
//! a tick can never observe a half-applied command. Observers read the
//! latest [`TimerState`] from a watch channel or follow the event stream
//! on a broadcast channel.

use std::future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::clock::{Clock, TICK_PERIOD};
use crate::session::{FocusRating, SessionRecord};
use crate::session_log::RateError;
use crate::settings::{Settings, SettingsPatch, ValidationError};
use crate::timer::{Timer, TimerEvent, TimerState};

const COMMAND_QUEUE: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Clock backed by a tokio interval
///
/// A late wakeup shifts the schedule instead of firing a burst of
/// catch-up ticks.
#[derive(Debug)]
pub struct IntervalClock {
    period: Duration,
    interval: Option<Interval>,
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalClock {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Resolves at the next tick; never resolves while disarmed
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}

impl Clock for IntervalClock {
    fn arm(&mut self) {
        if self.interval.is_none() {
            let mut interval = time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
        }
    }

    fn disarm(&mut self) {
        self.interval = None;
    }

    fn is_armed(&self) -> bool {
        self.interval.is_some()
    }
}

/// Why a command sent through a [`TimerHandle`] failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rate(#[from] RateError),

    #[error("Timer task has stopped")]
    Closed,
}

enum Command {
    Start(oneshot::Sender<TimerState>),
    Pause(oneshot::Sender<TimerState>),
    Toggle(oneshot::Sender<TimerState>),
    Reset(oneshot::Sender<TimerState>),
    UpdateSettings(
        SettingsPatch,
        oneshot::Sender<Result<Settings, ValidationError>>,
    ),
    Rate(
        u64,
        FocusRating,
        oneshot::Sender<Result<SessionRecord, RateError>>,
    ),
}

/// Cloneable handle to a running timer task
///
/// The task stops once every handle has been dropped.
#[derive(Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<TimerState>,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerHandle {
    pub async fn start(&self) -> Result<TimerState, CommandError> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<TimerState, CommandError> {
        self.request(Command::Pause).await
    }

    pub async fn toggle(&self) -> Result<TimerState, CommandError> {
        self.request(Command::Toggle).await
    }

    pub async fn reset(&self) -> Result<TimerState, CommandError> {
        self.request(Command::Reset).await
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, CommandError> {
        let settings = self
            .request(|reply| Command::UpdateSettings(patch, reply))
            .await??;
        Ok(settings)
    }

    pub async fn rate(&self, id: u64, rating: FocusRating) -> Result<SessionRecord, CommandError> {
        let record = self
            .request(|reply| Command::Rate(id, rating, reply))
            .await??;
        Ok(record)
    }

    /// Latest published state
    pub fn state(&self) -> TimerState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified after every command and tick
    pub fn watch(&self) -> watch::Receiver<TimerState> {
        self.state.clone()
    }

    /// Follow timer events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    async fn request<T, F>(&self, build: F) -> Result<T, CommandError>
    where
        F: FnOnce(oneshot::Sender<T>) -> Command,
    {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| CommandError::Closed)?;
        response.await.map_err(|_| CommandError::Closed)
    }
}

/// Move `timer` onto its own task. The join handle yields the timer back
/// once every [`TimerHandle`] is gone.
pub fn spawn(mut timer: Timer<IntervalClock>) -> (TimerHandle, JoinHandle<Timer<IntervalClock>>) {
    let (command_tx, mut command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (state_tx, state_rx) = watch::channel(timer.state().clone());
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let forward = event_tx.clone();
    timer.subscribe(move |event: &TimerEvent| {
        // Nobody listening is fine
        let _ = forward.send(event.clone());
    });

    let task = tokio::spawn(async move {
        info!("Timer task started");
        loop {
            tokio::select! {
                biased;

                command = command_rx.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    apply(&mut timer, command);
                }
                _ = timer.clock_mut().tick() => {
                    timer.tick();
                }
            }
            state_tx.send_replace(timer.state().clone());
        }
        timer.pause();
        info!("Timer task stopped");
        timer
    });

    let handle = TimerHandle {
        commands: command_tx,
        state: state_rx,
        events: event_tx,
    };
    (handle, task)
}

fn apply(timer: &mut Timer<IntervalClock>, command: Command) {
    // A caller that gave up waiting does not undo the command
    match command {
        Command::Start(reply) => {
            timer.start();
            let _ = reply.send(timer.state().clone());
        }
        Command::Pause(reply) => {
            timer.pause();
            let _ = reply.send(timer.state().clone());
        }
        Command::Toggle(reply) => {
            timer.toggle();
            let _ = reply.send(timer.state().clone());
        }
        Command::Reset(reply) => {
            timer.reset();
            let _ = reply.send(timer.state().clone());
        }
        Command::UpdateSettings(patch, reply) => {
            let result = timer.update_settings(&patch);
            if let Err(e) = &result {
                debug!("Rejected settings update: {}", e);
            }
            let _ = reply.send(result);
        }
        Command::Rate(id, rating, reply) => {
            let _ = reply.send(timer.rate(id, rating));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use crate::session_log::SessionLog;
    use crate::settings::SettingsStore;

    fn short_timer() -> Timer<IntervalClock> {
        let settings = Settings {
            focus_duration: 1,
            short_break_duration: 1,
            long_break_duration: 2,
            long_break_interval: 2,
            ..Settings::default()
        };
        Timer::new(
            SettingsStore::in_memory(settings),
            SessionLog::in_memory(),
            IntervalClock::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_once_per_second() {
        let (handle, _task) = spawn(short_timer());

        let state = handle.start().await.unwrap();
        assert!(state.is_running);
        assert_eq!(state.seconds_remaining, 60);

        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(handle.state().seconds_remaining, 50);
        assert!(handle.state().is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_switches_mode_and_stops() {
        let (handle, task) = spawn(short_timer());
        let mut events = handle.subscribe();

        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(60_500)).await;

        let state = handle.state();
        assert_eq!(state.mode, Mode::ShortBreak);
        assert_eq!(state.seconds_remaining, 60);
        assert!(!state.is_running);
        assert_eq!(state.completed_focus_cycles, 1);

        // Stays put until started again
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(handle.state().seconds_remaining, 60);

        assert!(matches!(events.recv().await, Ok(TimerEvent::Started { .. })));
        assert!(matches!(
            events.recv().await,
            Ok(TimerEvent::Completed {
                previous_mode: Mode::Focus,
                ..
            })
        ));
        assert!(matches!(
            events.recv().await,
            Ok(TimerEvent::ModeChanged {
                to: Mode::ShortBreak,
                ..
            })
        ));

        drop(handle);
        let timer = task.await.unwrap();
        assert_eq!(timer.log().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_ticks() {
        let (handle, _task) = spawn(short_timer());

        handle.start().await.unwrap();
        time::sleep(Duration::from_millis(5_500)).await;
        let paused = handle.pause().await.unwrap();
        assert_eq!(paused.seconds_remaining, 55);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.state().seconds_remaining, 55);

        // Resuming waits a full period before the next tick
        handle.toggle().await.unwrap();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(handle.state().seconds_remaining, 55);
        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(handle.state().seconds_remaining, 54);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_and_rating_round_trip_through_task() {
        let (handle, _task) = spawn(short_timer());

        let settings = handle
            .update_settings(SettingsPatch::default().focus(2))
            .await
            .unwrap();
        assert_eq!(settings.focus_duration, 2);
        assert_eq!(handle.state().seconds_remaining, 120);

        let err = handle
            .update_settings(SettingsPatch::default().interval(0))
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::Validation(ValidationError::NonPositiveInterval(0)));

        let err = handle.rate(7, FocusRating::new(3).unwrap()).await.unwrap_err();
        assert_eq!(err, CommandError::Rate(RateError::UnknownSession(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_closed_task() {
        let (handle, task) = spawn(short_timer());
        task.abort();
        let _ = task.await;

        assert_eq!(handle.start().await.unwrap_err(), CommandError::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_clock_pending_while_disarmed() {
        let mut clock = IntervalClock::new();
        let waited = time::timeout(Duration::from_secs(5), clock.tick()).await;
        assert!(waited.is_err());

        clock.arm();
        let waited = time::timeout(Duration::from_millis(1_100), clock.tick()).await;
        assert!(waited.is_ok());
    }
}
