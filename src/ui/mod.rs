// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal user interface.
//!
//! The screen is a note roll above an 88-key keyboard with a one-line
//! status bar at the bottom. `Tui` owns the terminal and restores it on
//! drop; widgets read application state and never mutate it.

pub mod keyboard_view;
pub mod note_roll;

pub use keyboard_view::KeyboardWidget;
pub use note_roll::NoteRollWidget;

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{
        self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use crate::app::App;
use crate::control::BindingCategory;

/// Keyboard widget height including its border
const KEYBOARD_HEIGHT: u16 = 6;

/// Terminal handle with setup and teardown
pub struct Tui {
    /// Terminal handle
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Target frame rate
    frame_rate: u32,
    /// Whether keyboard enhancement flags were pushed
    enhanced: bool,
}

impl Tui {
    /// Set up the terminal and build the handle
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            frame_rate: 60,
            enhanced: false,
        })
    }

    /// Set frame rate
    pub fn set_frame_rate(&mut self, fps: u32) {
        self.frame_rate = fps.clamp(1, 120);
    }

    /// Ask the terminal for real key-release events (kitty protocol).
    ///
    /// Returns whether the terminal supports them; when it does not,
    /// the app falls back to its sustain timer.
    pub fn enable_key_release_events(&mut self) -> io::Result<bool> {
        if matches!(supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                self.terminal.backend_mut(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced = true;
        }
        Ok(self.enhanced)
    }

    /// Poll for the next event, waiting at most one frame
    pub fn poll_event(&self) -> io::Result<Option<Event>> {
        let frame_budget = Duration::from_millis(1000 / self.frame_rate as u64);
        if !event::poll(frame_budget)? {
            return Ok(None);
        }
        Ok(Some(event::read()?))
    }

    /// Draw one frame
    pub fn draw(&mut self, app: &App, now_ms: u64) -> io::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();

            // Main layout: note roll, keyboard, status bar
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(4),
                    Constraint::Length(KEYBOARD_HEIGHT),
                    Constraint::Length(1),
                ])
                .split(area);

            frame.render_widget(
                NoteRollWidget::new(app, now_ms)
                    .block(Block::default().borders(Borders::ALL).title(" Ivory ")),
                chunks[0],
            );

            frame.render_widget(
                KeyboardWidget::new(app).block(Block::default().borders(Borders::ALL)),
                chunks[1],
            );

            render_status_bar(frame, chunks[2], app, now_ms);

            if app.help_visible() {
                render_help_overlay(frame, area, app);
            }
        })?;

        Ok(())
    }

    /// Cleanup terminal on drop
    fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced {
            execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
        }
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Format a millisecond count as m:ss
fn format_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Render status bar
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, now_ms: u64) {
    let transport = if app.is_recording() {
        Span::styled(
            "● REC",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if app.is_replaying() {
        Span::styled(
            "▶ PLAY",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("■ STOP", Style::default().fg(Color::Yellow))
    };

    let mut spans = vec![Span::raw(" "), transport];

    if app.is_recording() {
        spans.push(Span::styled(
            format!(" {}", format_clock(app.recording_elapsed_ms(now_ms))),
            Style::default().fg(Color::Red),
        ));
    } else if app.is_replaying() {
        let (elapsed, total) = app.replay_progress_ms(now_ms);
        spans.push(Span::styled(
            format!(" {}/{}", format_clock(elapsed), format_clock(total)),
            Style::default().fg(Color::Green),
        ));
    }

    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("{} notes", app.recorded_count()),
        Style::default().fg(Color::Cyan),
    ));

    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("C{}", app.note_map().base_octave()),
        Style::default().fg(Color::Magenta),
    ));

    spans.push(Span::raw("  "));
    match app.midi_port_name() {
        Some(name) => spans.push(Span::styled(
            format!("MIDI: {}", name),
            Style::default().fg(Color::White),
        )),
        None => spans.push(Span::styled("no MIDI", Style::default().fg(Color::DarkGray))),
    }

    if !app.audio_running() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("muted", Style::default().fg(Color::Red)));
    }

    spans.push(Span::raw("  "));
    if let Some(msg) = app.status_message() {
        spans.push(Span::styled(
            msg.to_string(),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        spans.push(Span::styled(
            "F1: Help | F2: Record | F3: Replay | F4: Export | Esc: Quit",
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let base = app.note_map().base_octave();

    let mut lines = vec![
        Line::from(Span::styled(
            "Playing",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("  z s x d c v g b h n j m      C{0}-B{0}", base)),
        Line::from(format!(
            "  q 2 w 3 e r 5 t 6 y 7 u i    C{}-C{}",
            base + 1,
            base + 2
        )),
        Line::from(""),
    ];

    for category in BindingCategory::ALL {
        lines.push(Line::from(Span::styled(
            category.label(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for binding in app.controller().bindings_in(category) {
            lines.push(Line::from(format!(
                "  {:<12} {}",
                binding.shortcut.to_string(),
                binding.description
            )));
        }
        lines.push(Line::from(""));
    }

    // Popup sized to the text, centered on the screen
    let width = 44.min(area.width.saturating_sub(4));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let help_area = centered_rect(width, height, area);

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));
    frame.render_widget(Paragraph::new(lines).block(block), help_area);
}

/// Center a fixed-size rectangle inside an area
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

/// Merge a row of styled cells into a line, coalescing equal-style runs
pub(crate) fn row_line(cells: &[(char, Style)]) -> Line<'static> {
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();

    for &(c, style) in cells {
        if style == run_style {
            run.push(c);
        } else {
            if !run.is_empty() {
                spans.push(Span::styled(run.clone(), run_style));
                run.clear();
            }
            run.push(c);
            run_style = style;
        }
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }

    Line::from(spans)
}
