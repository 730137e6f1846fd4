//! Plain command-line commands (everything except the interactive timer)

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast::error::RecvError;
use zenfocus_core::format;

use zenfocus::audio::{AudioListener, TerminalBell};
use zenfocus::runtime::{self, IntervalClock};
use zenfocus::session::FocusRating;
use zenfocus::settings::{Settings, SettingsPatch, SettingsStore};
use zenfocus::stats::{activity_weeks, total_focus_minutes, ActivityLevel, CALENDAR_WINDOW};
use zenfocus::store::SharedStore;
use zenfocus::{Mode, SessionLog, Timer, TimerEvent, TimerState};

/// Longest day window accepted by `stats` and `history`
pub const MAX_DAYS: u32 = 36_500;

// ANSI color codes
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[0;33m";
const CYAN: &str = "\x1b[0;36m";
const MAGENTA: &str = "\x1b[0;35m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    io::stdout().is_terminal()
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn mode_color(mode: Mode) -> &'static str {
    match mode {
        Mode::Focus => MAGENTA,
        Mode::ShortBreak => GREEN,
        Mode::LongBreak => CYAN,
    }
}

/// Run one interval on the async driver, printing the countdown in place
pub fn cmd_run(store: SharedStore, mode: Mode) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    rt.block_on(run_interval(store, mode))
}

async fn run_interval(store: SharedStore, mode: Mode) -> Result<()> {
    let settings = SettingsStore::open(Arc::clone(&store));
    let log = SessionLog::open(store);
    let mut timer = Timer::new(settings, log, IntervalClock::new()).starting_in(mode);
    let listener = AudioListener::new(TerminalBell::stdout()).with_settings(timer.settings());
    timer.subscribe(listener);

    let (handle, task) = runtime::spawn(timer);
    let mut events = handle.subscribe();
    let mut state = handle.watch();

    println!(
        "{}",
        color(&format!("{}{}", BOLD, mode_color(mode)), mode.headline())
    );
    println!();
    let started = handle.start().await?;
    print_countdown(&started)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                if snapshot.mode == mode {
                    print_countdown(&snapshot)?;
                }
            }
            event = events.recv() => match event {
                Ok(TimerEvent::Completed { record, .. }) => {
                    println!();
                    println!();
                    println!(
                        "{} {} complete ({} min)",
                        color(GREEN, "[ok]"),
                        record.mode(),
                        record.duration_minutes()
                    );
                    if record.is_focus() {
                        println!();
                        println!("How focused were you? Rate it with:");
                        println!("  zenfocus rate {} <1-5>", record.id());
                    }
                    break;
                }
                Err(RecvError::Closed) => break,
                _ => {}
            },
            _ = &mut ctrl_c => {
                let paused = handle.pause().await?;
                println!();
                println!();
                println!(
                    "{} Stopped with {} left; nothing was recorded",
                    color(YELLOW, "[paused]"),
                    format::duration(paused.seconds_remaining as u64)
                );
                break;
            }
        }
    }

    drop(handle);
    task.await.context("Timer task failed")?;
    Ok(())
}

fn print_countdown(state: &TimerState) -> Result<()> {
    let mut out = io::stdout();
    write!(
        out,
        "\r  {}  [{}] {:>3}%",
        color(BOLD, &state.clock()),
        format::progress_bar(state.progress(), 30),
        (state.progress() * 100.0).round() as u32
    )?;
    out.flush()?;
    Ok(())
}

/// Show focus statistics
pub fn cmd_stats(store: SharedStore, days: u32) -> Result<()> {
    let log = SessionLog::open(store);
    let stats = log.stats();
    let (hours, mins) = stats.total_time();

    println!("{}Focus Statistics{}", BOLD, NC);
    println!();
    println!("  {}    {}", color(CYAN, "Focus Sessions:"), stats.focus_sessions);
    println!("  {}            {}", color(CYAN, "Breaks:"), stats.break_sessions);
    println!("  {}  {}h {}m", color(CYAN, "Total Focus Time:"), hours, mins);
    println!(
        "  {}    {} day{}",
        color(CYAN, "Current Streak:"),
        stats.streak,
        if stats.streak == 1 { "" } else { "s" }
    );
    if let Some(avg) = stats.average_rating {
        println!("  {}    {:.1} / 5", color(CYAN, "Average Rating:"), avg);
    }

    if log.is_empty() {
        println!();
        println!("No sessions yet. Start one with: zenfocus run");
        return Ok(());
    }

    let daily = log.daily_focus(days.max(1));
    let max = daily.iter().map(|d| d.minutes).max().unwrap_or(0).max(1);

    println!();
    println!("{}Last {} days{}", BOLD, days.max(1), NC);
    println!();
    for day in &daily {
        let bar = "\u{2588}".repeat((day.minutes as usize * 30) / max as usize);
        println!(
            "  {} {}  {:<30} {}",
            day.date.format("%a"),
            day.date.format("%m-%d"),
            color(MAGENTA, &bar),
            color(DIM, &format::hours_minutes(day.minutes))
        );
    }

    println!();
    println!("{}Activity (last {} days){}", BOLD, CALENDAR_WINDOW, NC);
    println!();
    let weeks = activity_weeks(&log.daily_focus(CALENDAR_WINDOW));
    for (weekday, name) in ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
        .iter()
        .enumerate()
    {
        let row: String = weeks
            .iter()
            .map(|week| match week.days[weekday] {
                Some(minutes) => ActivityLevel::from_minutes(minutes).glyph(),
                None => ' ',
            })
            .collect();
        println!("  {}  {}", color(DIM, name), row);
    }

    Ok(())
}

/// List completed sessions of the last `days` days, newest last
pub fn cmd_history(store: SharedStore, days: u32) -> Result<()> {
    let log = SessionLog::open(store);
    let (start, end) = history_window(Utc::now(), days);

    let records: Vec<_> = log.query_range(start, end).collect();
    if records.is_empty() {
        println!("No sessions in the last {} days", days);
        return Ok(());
    }

    println!(
        "{}{:<15} {:<17} {:<12} {:>5}  {}{}",
        BOLD, "ID", "When", "Mode", "Mins", "Rating", NC
    );
    for record in &records {
        let rating = record
            .focus_rating()
            .map(|r| format!("{} {}", r.value(), r.label()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<15} {:<17} {} {:>5}  {}",
            record.id(),
            format::timestamp(record.timestamp()),
            color(mode_color(record.mode()), &format!("{:<12}", record.mode().label())),
            record.duration_minutes(),
            rating
        );
    }

    let focus_minutes = total_focus_minutes(records.iter().copied());
    println!();
    println!(
        "{} sessions, {} focused",
        records.len(),
        format::hours_minutes(focus_minutes)
    );

    Ok(())
}

/// Half-open range covering the last `days` days up to and including `now`
fn history_window(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .checked_sub_signed(Duration::days(days as i64))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = now
        .checked_add_signed(Duration::seconds(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

/// Show settings, applying `patch` first when it changes anything
pub fn cmd_settings(store: SharedStore, patch: &SettingsPatch) -> Result<()> {
    let mut settings = SettingsStore::open(store);

    if !patch.is_empty() {
        settings
            .update(patch)
            .context("Settings not changed")?;
        println!("{} Settings updated", color(GREEN, "[ok]"));
        println!();
    }

    print_settings(settings.get());
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("{}Settings{}", BOLD, NC);
    println!();
    println!("  {}        {} min", color(CYAN, "Focus:"), settings.focus_duration);
    println!(
        "  {}  {} min",
        color(CYAN, "Short break:"),
        settings.short_break_duration
    );
    println!(
        "  {}   {} min",
        color(CYAN, "Long break:"),
        settings.long_break_duration
    );
    println!(
        "  {} every {} focus sessions",
        color(CYAN, "Long break:"),
        settings.long_break_interval
    );
    println!("  {}        {}", color(CYAN, "Theme:"), settings.selected_theme.as_str());
    println!("  {}        {}", color(CYAN, "Sound:"), settings.ambient_sound.as_str());
    println!(
        "  {}       {:.0}%",
        color(CYAN, "Volume:"),
        settings.sound_volume * 100.0
    );
}

/// Attach a focus rating to a completed focus session
pub fn cmd_rate(store: SharedStore, id: u64, rating: i64) -> Result<()> {
    let rating = FocusRating::new(rating)?;
    let mut log = SessionLog::open(store);

    let record = log.rate(id, rating)?.clone();
    log.flush().context("Failed to save session log")?;

    println!(
        "{} Rated {} session from {}: {} ({})",
        color(GREEN, "[ok]"),
        record.mode().label().to_lowercase(),
        format::timestamp(record.timestamp()),
        rating.value(),
        rating.label()
    );
    Ok(())
}
