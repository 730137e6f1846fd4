//! Whole-lifecycle tests over a file-backed store

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use zenfocus::runtime::{self, IntervalClock};
use zenfocus::stats::FocusStats;
use zenfocus::store::{SESSIONS_KEY, SETTINGS_KEY};
use zenfocus::{
    FileStore, FocusRating, KeyValueStore, ManualClock, Mode, SessionLog, SettingsPatch,
    SettingsStore, SharedStore, Timer, TimerEvent,
};

fn file_store(dir: &TempDir) -> SharedStore {
    Arc::new(FileStore::new(dir.path()).unwrap())
}

fn finish(timer: &mut Timer<ManualClock>) {
    timer.start();
    while timer.tick().is_none() {}
}

#[test]
fn test_four_pomodoros_then_restart() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let at = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();

    let mut timer = Timer::new(
        SettingsStore::open(Arc::clone(&store)),
        SessionLog::open(Arc::clone(&store)),
        ManualClock::new(),
    )
    .with_time_source(move || at);

    let completions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completions);
    timer.subscribe(move |event: &TimerEvent| {
        if let TimerEvent::Completed { previous_mode, .. } = event {
            sink.lock().unwrap().push(*previous_mode);
        }
    });

    let mut sequence = vec![timer.state().mode];
    for _ in 0..8 {
        finish(&mut timer);
        sequence.push(timer.state().mode);
    }

    assert_eq!(
        sequence,
        vec![
            Mode::Focus,
            Mode::ShortBreak,
            Mode::Focus,
            Mode::ShortBreak,
            Mode::Focus,
            Mode::ShortBreak,
            Mode::Focus,
            Mode::LongBreak,
            Mode::Focus,
        ]
    );
    assert_eq!(completions.lock().unwrap().len(), 8);

    // A new process sees the same history and starts a fresh cycle
    drop(timer);
    let log = SessionLog::open(Arc::clone(&store));
    assert_eq!(log.len(), 8);

    let today = at.date_naive();
    let stats = FocusStats::from_records(log.records(), today, &Utc);
    assert_eq!(stats.focus_sessions, 4);
    assert_eq!(stats.break_sessions, 4);
    assert_eq!(stats.total_minutes, 100);
    assert_eq!(stats.streak, 1);

    let timer = Timer::new(SettingsStore::open(store), log, ManualClock::new());
    assert_eq!(timer.state().mode, Mode::Focus);
    assert_eq!(timer.state().completed_focus_cycles, 0);
}

#[test]
fn test_settings_survive_restart_and_shape_sessions() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    let mut timer = Timer::new(
        SettingsStore::open(Arc::clone(&store)),
        SessionLog::open(Arc::clone(&store)),
        ManualClock::new(),
    );
    timer
        .update_settings(&SettingsPatch::default().focus(50).short_break(10).interval(2))
        .unwrap();
    assert_eq!(timer.state().seconds_remaining, 3000);

    // Rejected updates leave the stored blob alone
    assert!(timer
        .update_settings(&SettingsPatch::default().long_break(0))
        .is_err());

    let blob = store.load(SETTINGS_KEY).unwrap().unwrap();
    assert_eq!(blob["focusDuration"], 50);
    assert_eq!(blob["longBreakDuration"], 15);

    let mut timer = Timer::new(
        SettingsStore::open(Arc::clone(&store)),
        SessionLog::open(Arc::clone(&store)),
        ManualClock::new(),
    );
    assert_eq!(timer.state().seconds_remaining, 3000);

    finish(&mut timer);
    assert_eq!(timer.state().seconds_remaining, 600);
    let record = timer.log().last_focus().cloned().unwrap();
    assert_eq!(record.duration_minutes(), 50);

    timer.rate(record.id(), FocusRating::new(5).unwrap()).unwrap();
    let reopened = SessionLog::open(store);
    assert_eq!(
        reopened.get(record.id()).and_then(|r| r.focus_rating()),
        Some(FocusRating::new(5).unwrap())
    );
}

#[test]
fn test_corrupt_files_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(format!("{}.json", SETTINGS_KEY)), "{not json").unwrap();
    std::fs::write(dir.path().join(format!("{}.json", SESSIONS_KEY)), "[1, 2").unwrap();
    let store = file_store(&dir);

    let timer = Timer::new(
        SettingsStore::open(Arc::clone(&store)),
        SessionLog::open(store),
        ManualClock::new(),
    );
    assert_eq!(timer.state().seconds_remaining, 1500);
    assert!(timer.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_async_driver_records_to_disk() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    SettingsStore::open(Arc::clone(&store))
        .update(&SettingsPatch::default().focus(1))
        .unwrap();

    let timer = Timer::new(
        SettingsStore::open(Arc::clone(&store)),
        SessionLog::open(Arc::clone(&store)),
        IntervalClock::new(),
    );
    let (handle, task) = runtime::spawn(timer);

    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    handle.pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(handle.state().seconds_remaining, 30);

    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(handle.state().mode, Mode::ShortBreak);

    drop(handle);
    task.await.unwrap();

    let log = SessionLog::open(store);
    assert_eq!(log.len(), 1);
    assert_eq!(log.records()[0].mode(), Mode::Focus);
    assert_eq!(log.records()[0].duration_minutes(), 1);
}
