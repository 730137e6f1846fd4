//! Interactive timer state

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, warn};

use zenfocus::audio::{AudioListener, TerminalBell};
use zenfocus::quotes::{quote_for, Quote};
use zenfocus::settings::{Settings, SettingsPatch, SettingsStore};
use zenfocus::stats::{activity_weeks, ActivityWeek, DailyFocus, CALENDAR_WINDOW, WEEK_WINDOW};
use zenfocus::store::SharedStore;
use zenfocus::{FocusRating, FocusStats, PollClock, SessionLog, Timer, TimerEvent, TimerState};

/// Upper bound on how long the loop blocks waiting for input
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Volume changes in tenths
const VOLUME_STEP: f32 = 0.1;

/// Application state for the interactive timer
pub struct App {
    timer: Timer<PollClock>,
    events: Receiver<TimerEvent>,
    pub show_stats: bool,
    pub show_help: bool,
    /// Focus session waiting for a rating
    pub pending_rating: Option<u64>,
    pub status: Option<String>,
    pub stats: FocusStats,
    pub week: Vec<DailyFocus>,
    pub calendar: Vec<ActivityWeek>,
}

impl App {
    pub fn new(store: SharedStore) -> Self {
        let settings = SettingsStore::open(Arc::clone(&store));
        let log = SessionLog::open(store);
        let mut timer = Timer::new(settings, log, PollClock::new());

        let audio = AudioListener::new(TerminalBell::stdout()).with_settings(timer.settings());
        timer.subscribe(audio);

        let (tx, events) = mpsc::channel();
        timer.subscribe(move |event: &TimerEvent| {
            // The receiver lives as long as the app
            let _ = tx.send(event.clone());
        });

        let mut app = Self {
            timer,
            events,
            show_stats: false,
            show_help: false,
            pending_rating: None,
            status: None,
            stats: FocusStats::default(),
            week: Vec::new(),
            calendar: Vec::new(),
        };
        app.refresh_stats();
        app
    }

    pub fn state(&self) -> &TimerState {
        self.timer.state()
    }

    pub fn settings(&self) -> &Settings {
        self.timer.settings()
    }

    pub fn quote(&self) -> &'static Quote {
        quote_for(Local::now().date_naive())
    }

    /// How long to wait for a key before the next tick is due
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        self.timer
            .clock()
            .until_due(now)
            .map_or(IDLE_POLL, |due| due.min(IDLE_POLL))
    }

    /// Advance the countdown if a second has passed, then react to
    /// whatever the timer reported
    pub fn on_tick(&mut self, now: Instant) {
        if self.timer.clock_mut().due(now) {
            self.timer.tick();
        }
        self.drain_events();
    }

    pub fn toggle(&mut self) {
        self.timer.toggle();
        self.drain_events();
    }

    pub fn reset(&mut self) {
        self.timer.reset();
        self.drain_events();
    }

    pub fn rate(&mut self, value: i64) {
        let Some(id) = self.pending_rating else {
            return;
        };

        let rating = match FocusRating::new(value) {
            Ok(rating) => rating,
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        };

        match self.timer.rate(id, rating) {
            Ok(_) => self.pending_rating = None,
            Err(e) => {
                warn!("Rating session {} failed: {}", id, e);
                self.pending_rating = None;
                self.status = Some(e.to_string());
            }
        }
        self.drain_events();
    }

    pub fn cycle_sound(&mut self) {
        let next = self.settings().ambient_sound.next();
        self.apply(SettingsPatch::default().sound(next));
    }

    pub fn cycle_theme(&mut self) {
        let next = self.settings().selected_theme.next();
        self.apply(SettingsPatch::default().theme(next));
    }

    /// Step the volume up or down by tenths
    pub fn change_volume(&mut self, steps: i32) {
        let current = (self.settings().sound_volume / VOLUME_STEP).round() as i32;
        let next = ((current + steps).clamp(0, 10) as f32 * VOLUME_STEP).clamp(0.0, 1.0);
        self.apply(SettingsPatch::default().volume(next));
    }

    pub fn toggle_stats(&mut self) {
        self.show_stats = !self.show_stats;
        if self.show_stats {
            self.refresh_stats();
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Close the topmost overlay; false when none was open
    pub fn close_overlay(&mut self) -> bool {
        if self.show_help {
            self.show_help = false;
            true
        } else if self.pending_rating.is_some() {
            self.pending_rating = None;
            true
        } else if self.show_stats {
            self.show_stats = false;
            true
        } else {
            false
        }
    }

    /// Stop the countdown before the terminal is torn down
    pub fn shutdown(&mut self) {
        self.timer.pause();
    }

    fn apply(&mut self, patch: SettingsPatch) {
        match self.timer.update_settings(&patch) {
            Ok(settings) => {
                self.status = Some(format!(
                    "Theme {} | Sound {} | Volume {:.0}%",
                    settings.selected_theme.as_str(),
                    settings.ambient_sound.as_str(),
                    settings.sound_volume * 100.0
                ));
            }
            Err(e) => self.status = Some(e.to_string()),
        }
        self.drain_events();
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                TimerEvent::Completed { record, .. } => {
                    if record.is_focus() {
                        self.pending_rating = Some(record.id());
                        self.status = Some("Focus session complete. How focused were you?".into());
                    } else {
                        self.pending_rating = None;
                        self.status = Some("Break is over. Ready to focus?".into());
                    }
                    self.refresh_stats();
                }
                TimerEvent::Rated { record } => {
                    if let Some(rating) = record.focus_rating() {
                        self.status = Some(format!("Rated: {}", rating.label()));
                    }
                    self.refresh_stats();
                }
                TimerEvent::Started { .. } => self.status = None,
                other => debug!("Timer event: {:?}", other),
            }
        }
    }

    fn refresh_stats(&mut self) {
        let log = self.timer.log();
        self.stats = log.stats();
        self.week = log.daily_focus(WEEK_WINDOW);
        self.calendar = activity_weeks(&log.daily_focus(CALENDAR_WINDOW));
    }
}
