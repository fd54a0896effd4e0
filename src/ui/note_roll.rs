// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note roll display widget.
//!
//! Each press shows as a bar in the column of its key. The bar grows
//! upward from the bottom edge while the key is held, then slides up
//! and fades once released, mirroring the tracker's animation model.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Paragraph, Widget},
};

use super::row_line;
use crate::app::App;
use crate::notes::{NoteColor, MAX_GROW_MS};

/// Note roll widget for displaying in-flight notes
pub struct NoteRollWidget<'a> {
    app: &'a App,
    now_ms: u64,
    block: Option<Block<'a>>,
}

impl<'a> NoteRollWidget<'a> {
    /// Create a new note roll widget
    pub fn new(app: &'a App, now_ms: u64) -> Self {
        Self {
            app,
            now_ms,
            block: None,
        }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Terminal color for a bar
fn bar_color(color: NoteColor) -> Color {
    match color {
        NoteColor::White => Color::Cyan,
        NoteColor::Black => Color::Magenta,
        NoteColor::Replay => Color::Green,
    }
}

/// Bar fill by opacity; fading bars thin out
fn bar_char(opacity: f64) -> char {
    if opacity > 0.75 {
        '█'
    } else if opacity > 0.5 {
        '▓'
    } else if opacity > 0.25 {
        '▒'
    } else {
        '░'
    }
}

impl Widget for NoteRollWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let notes = self.app.visual_notes();
        if notes.is_empty() {
            let hint = Paragraph::new("Play with the letter rows (z-m, q-i)")
                .style(Style::default().fg(Color::DarkGray));
            hint.render(inner, buf);
            return;
        }

        let width = inner.width as usize;
        let height = inner.height as usize;
        let cells_per_unit = inner.width as f64 / self.app.keyboard().width();

        let mut cells = vec![vec![(' ', Style::default()); width]; height];

        // Spawn order; newer bars draw over older ones
        for note in notes {
            let x0 = ((note.left * cells_per_unit).round() as usize).min(width - 1);
            let x1 = (((note.left + note.width) * cells_per_unit).round() as usize)
                .clamp(x0 + 1, width);

            let growth = note.growth_ms(self.now_ms) as f64 / MAX_GROW_MS as f64;
            let bar_height = ((growth * height as f64).round() as usize).max(1);

            // Slide carries the bar past the top edge
            let travel = (height + bar_height) as f64;
            let offset = (note.slide_progress(self.now_ms) * travel).round() as usize;

            let style = Style::default().fg(bar_color(note.color));
            let fill = bar_char(note.opacity(self.now_ms));

            for from_bottom in offset..offset + bar_height {
                if from_bottom >= height {
                    break;
                }
                let row = height - 1 - from_bottom;
                for cell in &mut cells[row][x0..x1] {
                    *cell = (fill, style);
                }
            }
        }

        let lines: Vec<Line> = cells.iter().map(|row| row_line(row)).collect();
        Paragraph::new(lines).render(inner, buf);
    }
}
