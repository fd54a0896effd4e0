// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Computer-keyboard note mapping.
//!
//! Two playing rows cover two octaves chromatically: the Z row starts at
//! C of the base octave and the Q row one octave above, with the number
//! row supplying the sharps. Arrow keys shift the base octave.

/// Lowest selectable base octave (Z row starts at C1)
pub const MIN_BASE_OCTAVE: u8 = 1;
/// Highest selectable base octave (Q row tops out at C8)
pub const MAX_BASE_OCTAVE: u8 = 6;
/// Default base octave (Z row starts at middle C)
pub const DEFAULT_BASE_OCTAVE: u8 = 4;

/// Z row: one chromatic octave from C
const LOWER_ROW: [(char, u8); 12] = [
    ('z', 0),
    ('s', 1),
    ('x', 2),
    ('d', 3),
    ('c', 4),
    ('v', 5),
    ('g', 6),
    ('b', 7),
    ('h', 8),
    ('n', 9),
    ('j', 10),
    ('m', 11),
];

/// Q row: the octave above, plus the top C
const UPPER_ROW: [(char, u8); 13] = [
    ('q', 12),
    ('2', 13),
    ('w', 14),
    ('3', 15),
    ('e', 16),
    ('r', 17),
    ('5', 18),
    ('t', 19),
    ('6', 20),
    ('y', 21),
    ('7', 22),
    ('u', 23),
    ('i', 24),
];

/// Maps typing keys to MIDI notes relative to a shiftable base octave
#[derive(Debug, Clone)]
pub struct NoteMap {
    base_octave: u8,
}

impl NoteMap {
    /// Create a note map at the default base octave
    pub fn new() -> Self {
        Self::with_base_octave(DEFAULT_BASE_OCTAVE)
    }

    /// Create a note map at a specific base octave (clamped to the valid range)
    pub fn with_base_octave(base_octave: u8) -> Self {
        Self {
            base_octave: base_octave.clamp(MIN_BASE_OCTAVE, MAX_BASE_OCTAVE),
        }
    }

    /// MIDI note of C in the base octave
    fn base_midi(&self) -> u8 {
        // C4 = 60 under the convention midi = 12 * (octave + 1)
        12 * (self.base_octave + 1)
    }

    /// Look up the MIDI note for a typed character
    pub fn note_for(&self, c: char) -> Option<u8> {
        let c = c.to_ascii_lowercase();
        let offset = LOWER_ROW
            .iter()
            .chain(UPPER_ROW.iter())
            .find(|(ch, _)| *ch == c)
            .map(|(_, offset)| *offset)?;
        Some(self.base_midi() + offset)
    }

    /// Typed character that plays the given MIDI note, if any
    pub fn char_for_midi(&self, midi: u8) -> Option<char> {
        let base = self.base_midi();
        if midi < base {
            return None;
        }
        let offset = midi - base;
        LOWER_ROW
            .iter()
            .chain(UPPER_ROW.iter())
            .find(|(_, o)| *o == offset)
            .map(|(ch, _)| *ch)
    }

    /// Shift the base octave up, returns true if it changed
    pub fn octave_up(&mut self) -> bool {
        if self.base_octave < MAX_BASE_OCTAVE {
            self.base_octave += 1;
            true
        } else {
            false
        }
    }

    /// Shift the base octave down, returns true if it changed
    pub fn octave_down(&mut self) -> bool {
        if self.base_octave > MIN_BASE_OCTAVE {
            self.base_octave -= 1;
            true
        } else {
            false
        }
    }

    /// Current base octave
    pub fn base_octave(&self) -> u8 {
        self.base_octave
    }
}

impl Default for NoteMap {
    fn default() -> Self {
        Self::new()
    }
}
