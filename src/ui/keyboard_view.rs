// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard display widget.
//!
//! Draws all 88 keys scaled to the terminal width. The top rows show
//! the black keys over the white-key tops, the bottom rows the white
//! keys with their typing-row labels. Held keys light up.

use std::collections::HashMap;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Paragraph, Widget},
};

use super::row_line;
use crate::app::App;
use crate::keyboard::WHITE_KEY_COUNT;

/// White keys get a boundary line when at least this wide, in cells
const BOUNDARY_MIN_CELLS: f64 = 3.0;

/// Keyboard widget for displaying key state
pub struct KeyboardWidget<'a> {
    app: &'a App,
    block: Option<Block<'a>>,
}

impl<'a> KeyboardWidget<'a> {
    /// Create a new keyboard widget
    pub fn new(app: &'a App) -> Self {
        Self { app, block: None }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Fill color for a white key body
fn white_bg(pressed: bool) -> Color {
    if pressed {
        Color::Yellow
    } else {
        Color::White
    }
}

impl Widget for KeyboardWidget<'_> {
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

        let keyboard = self.app.keyboard();
        let cells_per_unit = inner.width as f64 / keyboard.width();
        let width = inner.width as usize;

        // White key id per white-key index; white key lefts are the
        // integers 0..52
        let mut white_ids = vec![0usize; WHITE_KEY_COUNT];
        for key in keyboard.keys().iter().filter(|k| !k.is_black) {
            white_ids[key.left as usize] = key.id;
        }

        // Per-column key coverage, sampled at the column center
        let mut white_at = Vec::with_capacity(width);
        let mut black_at = Vec::with_capacity(width);
        for col in 0..width {
            let unit = (col as f64 + 0.5) / cells_per_unit;
            let index = (unit.floor() as usize).min(WHITE_KEY_COUNT - 1);
            white_at.push(white_ids[index]);
            black_at.push(
                keyboard
                    .keys()
                    .iter()
                    .find(|k| k.is_black && unit >= k.left && unit < k.left + k.width)
                    .map(|k| k.id),
            );
        }

        // Typing-row labels at each key's center column
        let mut white_labels: HashMap<usize, char> = HashMap::new();
        let mut black_labels: HashMap<usize, char> = HashMap::new();
        for key in keyboard.keys() {
            if let Some(c) = self.app.note_map().char_for_midi(key.midi) {
                let col = ((key.left + key.width / 2.0) * cells_per_unit) as usize;
                if col >= width {
                    continue;
                }
                if key.is_black {
                    // Only place the label if the key actually covers
                    // the column at this scale
                    if black_at[col] == Some(key.id) {
                        black_labels.insert(col, c);
                    }
                } else {
                    white_labels.insert(col, c);
                }
            }
        }

        let draw_boundaries = cells_per_unit >= BOUNDARY_MIN_CELLS;
        let black_rows = inner.height.saturating_sub(2);

        let mut lines: Vec<Line> = Vec::with_capacity(inner.height as usize);
        for row in 0..inner.height {
            let mut cells: Vec<(char, Style)> = Vec::with_capacity(width);
            for col in 0..width {
                let white_id = white_at[col];
                let white_pressed = self.app.is_key_pressed(white_id);
                let boundary =
                    draw_boundaries && col > 0 && white_at[col - 1] != white_id;

                let cell = if row < black_rows {
                    match black_at[col] {
                        Some(black_id) => {
                            let pressed = self.app.is_key_pressed(black_id);
                            let bg = if pressed { Color::Yellow } else { Color::DarkGray };
                            let label = if row + 1 == black_rows {
                                black_labels.get(&col).copied()
                            } else {
                                None
                            };
                            match label {
                                Some(c) => {
                                    let fg = if pressed { Color::Black } else { Color::White };
                                    (c, Style::default().fg(fg).bg(bg))
                                }
                                None => (' ', Style::default().bg(bg)),
                            }
                        }
                        None => (' ', Style::default().bg(white_bg(white_pressed))),
                    }
                } else if row + 1 < inner.height {
                    // White key body
                    if boundary {
                        (
                            '▏',
                            Style::default()
                                .fg(Color::DarkGray)
                                .bg(white_bg(white_pressed)),
                        )
                    } else {
                        (' ', Style::default().bg(white_bg(white_pressed)))
                    }
                } else {
                    // Label row
                    match white_labels.get(&col) {
                        Some(&c) => (
                            c,
                            Style::default().fg(Color::Black).bg(white_bg(white_pressed)),
                        ),
                        None if boundary => (
                            '▏',
                            Style::default()
                                .fg(Color::DarkGray)
                                .bg(white_bg(white_pressed)),
                        ),
                        None => (' ', Style::default().bg(white_bg(white_pressed))),
                    }
                };
                cells.push(cell);
            }
            lines.push(row_line(&cells));
        }

        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PressSource;
    use crate::config::PianoConfig;
    use ratatui::widgets::Borders;

    fn render(app: &App, width: u16, height: u16) -> Buffer {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        KeyboardWidget::new(app)
            .block(Block::default().borders(Borders::ALL))
            .render(area, &mut buf);
        buf
    }

    fn count_bg(buf: &Buffer, color: Color) -> usize {
        let area = *buf.area();
        let mut count = 0;
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let Some(cell) = buf.cell((x, y)) {
                    if cell.style().bg == Some(color) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    #[test]
    fn test_renders_white_and_black_keys() {
        let app = App::new(PianoConfig::default());
        let buf = render(&app, 120, 6);

        assert!(count_bg(&buf, Color::White) > 0);
        assert!(count_bg(&buf, Color::DarkGray) > 0);
        assert_eq!(count_bg(&buf, Color::Yellow), 0);
    }

    #[test]
    fn test_pressed_key_highlighted() {
        let mut app = App::new(PianoConfig::default());
        app.press_key(39, 100, PressSource::Keyboard, 0);

        let buf = render(&app, 120, 6);
        assert!(count_bg(&buf, Color::Yellow) > 0);
    }

    #[test]
    fn test_tiny_area_does_not_panic() {
        let app = App::new(PianoConfig::default());
        render(&app, 3, 3);
        render(&app, 1, 1);
    }
}
