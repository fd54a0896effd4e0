// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The 88-key keyboard model.
//!
//! Provides the static key table (note names, MIDI numbers, equal-tempered
//! frequencies) and the horizontal key geometry, measured in white-key
//! units, that the note roll and the keyboard renderer share.

use std::fmt;

/// Number of keys on a full piano keyboard
pub const KEY_COUNT: usize = 88;

/// MIDI note number of the lowest key (A0)
pub const LOWEST_MIDI_NOTE: u8 = 21;

/// MIDI note number of the highest key (C8)
pub const HIGHEST_MIDI_NOTE: u8 = 108;

/// Number of white keys across the keyboard
pub const WHITE_KEY_COUNT: usize = 52;

/// Black key width as a fraction of a white key
pub const BLACK_KEY_WIDTH: f64 = 0.6;

/// Note names in chromatic order starting at C
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single piano key
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Keyboard position (0 = A0, 87 = C8)
    pub id: usize,
    /// Note name with octave (e.g. "C#4")
    pub name: String,
    /// MIDI note number (21-108)
    pub midi: u8,
    /// Whether this is a black (sharp) key
    pub is_black: bool,
    /// Frequency in Hz (equal temperament, A4 = 440)
    pub frequency: f64,
    /// Left edge in white-key units from the keyboard's left edge
    pub left: f64,
    /// Width in white-key units
    pub width: f64,
}

impl Key {
    /// Octave number (A0 is octave 0, C8 is octave 8)
    pub fn octave(&self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Pitch class (0 = C, 11 = B)
    pub fn pitch_class(&self) -> u8 {
        self.midi % 12
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Frequency in Hz for a MIDI note number (equal temperament, A4 = 440)
pub fn midi_to_frequency(midi: u8) -> f64 {
    440.0 * 2f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Build the 88-entry key table, A0 (MIDI 21) through C8 (MIDI 108).
///
/// White keys occupy consecutive integer positions; black keys are 0.6
/// white-widths wide, centered on the boundary between their neighbors.
fn build_keys() -> Vec<Key> {
    let mut keys = Vec::with_capacity(KEY_COUNT);
    let mut white_index = 0usize;

    for midi in LOWEST_MIDI_NOTE..=HIGHEST_MIDI_NOTE {
        let pitch_class = (midi % 12) as usize;
        let name = format!("{}{}", NOTE_NAMES[pitch_class], (midi / 12) as i8 - 1);
        let is_black = NOTE_NAMES[pitch_class].contains('#');

        let (left, width) = if is_black {
            // Centered on the boundary after the previous white key
            (white_index as f64 - BLACK_KEY_WIDTH / 2.0, BLACK_KEY_WIDTH)
        } else {
            let left = white_index as f64;
            white_index += 1;
            (left, 1.0)
        };

        keys.push(Key {
            id: keys.len(),
            name,
            midi,
            is_black,
            frequency: midi_to_frequency(midi),
            left,
            width,
        });
    }

    keys
}

/// The full keyboard: the key table plus lookup helpers.
///
/// Generation is pure and deterministic; build one and reuse it.
#[derive(Debug, Clone)]
pub struct Keyboard {
    keys: Vec<Key>,
}

impl Keyboard {
    /// Build the standard 88-key keyboard
    pub fn new() -> Self {
        Self { keys: build_keys() }
    }

    /// All keys in ascending chromatic order
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Look up a key by keyboard position
    pub fn key(&self, id: usize) -> Option<&Key> {
        self.keys.get(id)
    }

    /// Look up a key by MIDI note number (None outside 21-108)
    pub fn key_for_midi(&self, midi: u8) -> Option<&Key> {
        if (LOWEST_MIDI_NOTE..=HIGHEST_MIDI_NOTE).contains(&midi) {
            self.keys.get((midi - LOWEST_MIDI_NOTE) as usize)
        } else {
            None
        }
    }

    /// Total keyboard width in white-key units
    pub fn width(&self) -> f64 {
        WHITE_KEY_COUNT as f64
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the table is empty (never, for a built keyboard)
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}
