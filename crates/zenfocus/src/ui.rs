//! UI rendering

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use zenfocus_core::format;

use zenfocus::settings::Theme;
use zenfocus::stats::ActivityLevel;
use zenfocus::Mode;

use crate::app::App;

/// Accent colour of a theme
fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Default => Color::Magenta,
        Theme::Forest => Color::Green,
        Theme::Ocean => Color::Cyan,
        Theme::Dusk => Color::LightRed,
    }
}

fn mode_color(mode: Mode, theme: Theme) -> Color {
    match mode {
        Mode::Focus => accent(theme),
        Mode::ShortBreak => Color::Green,
        Mode::LongBreak => Color::Blue,
    }
}

/// Main draw function
pub fn draw(f: &mut Frame, app: &App) {
    // Create main layout: header, content, footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    if app.show_stats {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        draw_timer(f, app, cols[0]);
        draw_stats(f, app, cols[1]);
    } else {
        draw_timer(f, app, chunks[1]);
    }

    draw_footer(f, app, chunks[2]);

    if app.pending_rating.is_some() {
        draw_rating_prompt(f, app);
    }
    if app.show_help {
        draw_help_overlay(f, app);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let settings = app.settings();
    let color = accent(settings.selected_theme);

    let streak = match app.stats.streak {
        0 => "no streak yet".to_string(),
        1 => "1 day streak".to_string(),
        n => format!("{} day streak", n),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ZenFocus ", Style::default().fg(color).bold()),
        Span::raw(" - "),
        Span::styled(streak, Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(
            format!(
                "sound: {} ({:.0}%)",
                settings.ambient_sound.as_str(),
                settings.sound_volume * 100.0
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
    );

    f.render_widget(header, area);
}

fn draw_timer(f: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let settings = app.settings();
    let color = mode_color(state.mode, settings.selected_theme);

    let block = Block::default()
        .title(format!(" {} ", state.mode.label()))
        .title_style(Style::default().fg(color).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Headline
            Constraint::Length(1), // Cycle
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Clock
            Constraint::Length(1), // Status
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Gauge
            Constraint::Min(0),    // Quote
        ])
        .split(inner);

    let headline = Paragraph::new(state.mode.headline())
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(headline, rows[1]);

    if state.mode == Mode::Focus {
        let cycle = Paragraph::new(format!(
            "Cycle {} of {}",
            state.cycle_position(settings.long_break_interval),
            settings.long_break_interval
        ))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
        f.render_widget(cycle, rows[2]);
    }

    let clock = Paragraph::new(state.clock())
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(clock, rows[4]);

    let (label, label_color) = if state.is_running {
        ("running", Color::Green)
    } else if state.seconds_remaining == state.interval_seconds {
        ("ready - press space", Color::DarkGray)
    } else {
        ("paused", Color::Yellow)
    };
    let status = Paragraph::new(label)
        .style(Style::default().fg(label_color))
        .alignment(Alignment::Center);
    f.render_widget(status, rows[5]);

    let gauge_area = centered(rows[7], 80);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .ratio(state.progress().clamp(0.0, 1.0))
        .label(format!("{:.0}%", state.progress() * 100.0));
    f.render_widget(gauge, gauge_area);

    let quote = app.quote();
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("\"{}\"", quote.text),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )),
        Line::from(Span::styled(
            format!("- {}", quote.author),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let quote = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(quote, centered(rows[8], 80));
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Statistics ")
        .title_style(Style::default().fg(Color::Blue).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Summary
            Constraint::Min(6),    // Weekly chart
            Constraint::Length(9), // Calendar
        ])
        .split(inner);

    let stats = &app.stats;
    let rating = stats
        .average_rating
        .map(|r| format!("{:.1} / 5", r))
        .unwrap_or_else(|| "-".to_string());
    let summary = vec![
        summary_line("Focus sessions", stats.focus_sessions.to_string()),
        summary_line("Breaks", stats.break_sessions.to_string()),
        summary_line("Total focus", format::hours_minutes(stats.total_minutes)),
        summary_line("Streak", format!("{} days", stats.streak)),
        summary_line("Avg rating", rating),
    ];
    f.render_widget(Paragraph::new(summary), rows[0]);

    let color = accent(app.settings().selected_theme);
    let bars: Vec<Bar> = app
        .week
        .iter()
        .map(|day| {
            Bar::default()
                .value(day.minutes as u64)
                .label(Line::from(day.date.format("%a").to_string()))
                .text_value(day.minutes.to_string())
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title(" Last 7 days (min) "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(4)
        .bar_gap(1)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color));
    f.render_widget(chart, rows[1]);

    let mut calendar = vec![Line::from(Span::styled(
        " Last 90 days",
        Style::default().fg(Color::DarkGray),
    ))];
    for (weekday, name) in ["S", "M", "T", "W", "T", "F", "S"].iter().enumerate() {
        let mut spans = vec![Span::styled(
            format!(" {} ", name),
            Style::default().fg(Color::DarkGray),
        )];
        for week in &app.calendar {
            let cell = match week.days[weekday] {
                Some(minutes) => {
                    let level = ActivityLevel::from_minutes(minutes);
                    Span::styled(level.glyph().to_string(), level_style(level, color))
                }
                None => Span::raw(" "),
            };
            spans.push(cell);
        }
        calendar.push(Line::from(spans));
    }
    f.render_widget(Paragraph::new(calendar), rows[2]);
}

fn summary_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {:<15}", label), Style::default().fg(Color::Cyan)),
        Span::raw(value),
    ])
}

fn level_style(level: ActivityLevel, color: Color) -> Style {
    match level {
        ActivityLevel::None => Style::default().fg(Color::DarkGray),
        ActivityLevel::Light | ActivityLevel::Moderate => Style::default().fg(color).dim(),
        _ => Style::default().fg(color),
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan).bold());

    let line = match &app.status {
        Some(message) => Line::from(vec![
            Span::raw(" "),
            Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
        ]),
        None => Line::from(vec![
            key(" space"),
            Span::raw(" start/pause  "),
            key("r"),
            Span::raw(" reset  "),
            key("s"),
            Span::raw(" stats  "),
            key("a"),
            Span::raw(" sound  "),
            key("t"),
            Span::raw(" theme  "),
            key("?"),
            Span::raw(" help  "),
            key("q"),
            Span::raw(" quit"),
        ]),
    };

    let footer = Paragraph::new(line).style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}

fn draw_rating_prompt(f: &mut Frame, app: &App) {
    let color = accent(app.settings().selected_theme);
    let popup_area = popup(f.area(), 44, 11);
    f.render_widget(Clear, popup_area);

    let labels = [
        "Very Unfocused",
        "Unfocused",
        "Neutral",
        "Focused",
        "Very Focused",
    ];
    let mut lines = vec![
        Line::from("How focused were you?").centered(),
        Line::from(""),
    ];
    for (i, label) in labels.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("   {}  ", i + 1), Style::default().fg(color).bold()),
            Span::raw(*label),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(
        Line::from(Span::styled(
            "Esc to skip",
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    );

    let prompt = Paragraph::new(lines).block(
        Block::default()
            .title(" Session Reflection ")
            .title_style(Style::default().fg(color).bold())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
    );
    f.render_widget(prompt, popup_area);
}

fn draw_help_overlay(f: &mut Frame, _app: &App) {
    let popup_area = popup(f.area(), 44, 14);

    // Clear the area behind the popup
    f.render_widget(Clear, popup_area);

    let entry = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(keys, Style::default().fg(Color::Cyan)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        Line::from(""),
        entry("  Space    ", "Start/pause"),
        entry("  r        ", "Reset interval"),
        entry("  s        ", "Toggle statistics"),
        entry("  1-5      ", "Rate finished focus session"),
        entry("  a        ", "Cycle ambient sound"),
        entry("  + / -    ", "Volume up/down"),
        entry("  t        ", "Cycle theme"),
        entry("  q        ", "Quit"),
        entry("  Esc      ", "Close overlay / quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? to close",
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ];

    let help_popup = Paragraph::new(help_text).block(
        Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(Style::default().fg(Color::Yellow).bold())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(help_popup, popup_area);
}

/// Centre a `width` x `height` box inside `area`
fn popup(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

/// Horizontally centred slice of `area`, `percent` wide
fn centered(area: Rect, percent: u16) -> Rect {
    let width = area.width * percent.min(100) / 100;
    Rect::new(area.x + (area.width - width) / 2, area.y, width, area.height)
}
