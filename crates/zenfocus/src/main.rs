//! zenfocus - Pomodoro focus timer
//!
//! "Stay focused. Take a break. Repeat."
//!
//! Usage:
//!   zenfocus                    Launch the interactive timer
//!   zenfocus run [--mode MODE]  Run one interval in the terminal
//!   zenfocus stats [DAYS]       Show focus statistics
//!   zenfocus history [DAYS]     List completed sessions
//!   zenfocus settings [...]     Show or change settings
//!   zenfocus rate ID RATING     Rate a completed focus session

mod app;
mod commands;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use zenfocus_core::Paths;

use zenfocus::settings::{AmbientSound, SettingsPatch, Theme};
use zenfocus::store::{FileStore, MemoryStore, SharedStore};
use zenfocus::Mode;

use app::App;

/// ZenFocus - Pomodoro focus timer with session history
#[derive(Parser)]
#[command(name = "zenfocus")]
#[command(about = "Pomodoro focus timer with session history and analytics")]
#[command(version)]
#[command(after_help = r#"CYCLE:
    Focus -> Short Break -> Focus -> ... -> Long Break
    Every Nth finished focus interval (default 4) earns a long break.
    The timer stops at the end of each interval; start the next one yourself.

EXAMPLES:
    zenfocus                        # Interactive timer
    zenfocus run                    # One 25-minute focus interval
    zenfocus run --mode short-break # One short break
    zenfocus stats 30               # Last 30 days of focus time
    zenfocus settings --focus 50 --short-break 10
    zenfocus rate 1717400000000 4   # Rate a focus session 1-5

KEY BINDINGS (interactive):
    Space       Start/pause
    r           Reset the current interval
    s           Toggle statistics panel
    1-5         Rate the focus session that just finished
    a           Cycle ambient sound
    + / -       Volume up/down
    t           Cycle theme
    ?           Toggle help
    q, Esc      Quit

LOGGING:
    RUST_LOG overrides the log filter. The interactive timer logs to
    <data-dir>/zenfocus.log, every other command to stderr."#)]
struct Cli {
    /// Directory for settings, session history and logs
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive timer (default)
    Tui,

    /// Run a single interval in the terminal
    #[command(alias = "r")]
    Run {
        /// Interval to run: focus, short-break or long-break
        #[arg(long, default_value = "focus", value_parser = parse_mode)]
        mode: Mode,
    },

    /// Show focus statistics
    #[command(alias = "statistics")]
    Stats {
        /// Number of days in the daily chart
        #[arg(default_value = "7", value_parser = days_arg())]
        days: u32,
    },

    /// List completed sessions
    #[command(alias = "log")]
    History {
        /// Number of days to list
        #[arg(default_value = "7", value_parser = days_arg())]
        days: u32,
    },

    /// Show settings, or change the given ones
    Settings {
        /// Focus length in minutes
        #[arg(long, value_name = "MINS", allow_negative_numbers = true)]
        focus: Option<i64>,

        /// Short break length in minutes
        #[arg(long, value_name = "MINS", allow_negative_numbers = true)]
        short_break: Option<i64>,

        /// Long break length in minutes
        #[arg(long, value_name = "MINS", allow_negative_numbers = true)]
        long_break: Option<i64>,

        /// Focus intervals before a long break
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        interval: Option<i64>,

        /// default, forest, ocean or dusk
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,

        /// none, rain, forest or whitenoise
        #[arg(long, value_parser = parse_sound)]
        sound: Option<AmbientSound>,

        /// Ambient volume from 0.0 to 1.0
        #[arg(long, allow_negative_numbers = true)]
        volume: Option<f32>,
    },

    /// Rate a completed focus session from 1 (very unfocused) to 5 (very focused)
    Rate {
        /// Session id, as shown by `zenfocus history`
        id: u64,

        /// Rating from 1 to 5
        #[arg(allow_negative_numbers = true)]
        rating: i64,
    },
}

/// Day windows from one day up to a hundred years
fn days_arg() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=commands::MAX_DAYS as i64)
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::parse(s).ok_or_else(|| format!("unknown mode '{}' (focus, short-break, long-break)", s))
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    Theme::parse(s).ok_or_else(|| format!("unknown theme '{}' (default, forest, ocean, dusk)", s))
}

fn parse_sound(s: &str) -> Result<AmbientSound, String> {
    AmbientSound::parse(s)
        .ok_or_else(|| format!("unknown sound '{}' (none, rain, forest, whitenoise)", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.data_dir {
        Some(dir) => Paths::with_data_dir(dir),
        None => Paths::new(),
    };
    let command = cli.command.unwrap_or(Commands::Tui);
    init_logging(&paths, cli.verbose, matches!(command, Commands::Tui))?;

    let store = open_store(&paths);

    match command {
        Commands::Tui => run_tui(store),
        Commands::Run { mode } => commands::cmd_run(store, mode),
        Commands::Stats { days } => commands::cmd_stats(store, days),
        Commands::History { days } => commands::cmd_history(store, days),
        Commands::Settings {
            focus,
            short_break,
            long_break,
            interval,
            theme,
            sound,
            volume,
        } => {
            let patch = SettingsPatch {
                focus_duration: focus,
                short_break_duration: short_break,
                long_break_duration: long_break,
                long_break_interval: interval,
                selected_theme: theme,
                ambient_sound: sound,
                sound_volume: volume,
            };
            commands::cmd_settings(store, &patch)
        }
        Commands::Rate { id, rating } => commands::cmd_rate(store, id, rating),
    }
}

/// Install the tracing subscriber. The TUI owns the terminal, so it logs
/// to a file instead of stderr.
fn init_logging(paths: &Paths, verbose: bool, to_file: bool) -> Result<()> {
    let default = if verbose { "zenfocus=debug" } else { "zenfocus=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if to_file {
        fs::create_dir_all(&paths.data)
            .with_context(|| format!("Failed to create {}", paths.data.display()))?;
        let log_path = paths.log_file();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

/// File store under the data directory, or a memory store when that
/// directory is unusable
fn open_store(paths: &Paths) -> SharedStore {
    let dir = paths.store();
    match FileStore::new(&dir) {
        Ok(store) => {
            debug!("Using store at {}", store.dir().display());
            Arc::new(store)
        }
        Err(e) => {
            warn!(
                "Cannot use {} ({}), settings and sessions will not be saved",
                dir.display(),
                e
            );
            MemoryStore::shared()
        }
    }
}

fn run_tui(store: SharedStore) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("Interactive timer started");
    let mut app = App::new(store);
    let result = run_app(&mut terminal, &mut app);
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = app.poll_timeout(Instant::now());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Esc => {
                            if !app.close_overlay() {
                                return Ok(());
                            }
                        }
                        KeyCode::Char(' ') | KeyCode::Enter => app.toggle(),
                        KeyCode::Char('r') => app.reset(),
                        KeyCode::Char('s') => app.toggle_stats(),
                        KeyCode::Char('a') => app.cycle_sound(),
                        KeyCode::Char('t') => app.cycle_theme(),
                        KeyCode::Char('+') | KeyCode::Char('=') => app.change_volume(1),
                        KeyCode::Char('-') => app.change_volume(-1),
                        KeyCode::Char('?') => app.toggle_help(),
                        KeyCode::Char(c @ '1'..='5') => {
                            if let Some(rating) = c.to_digit(10) {
                                app.rate(rating as i64);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        app.on_tick(Instant::now());
    }
}
