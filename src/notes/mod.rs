// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Visual note lifecycle tracking.
//!
//! Every press spawns a bar that grows while the key is held, then
//! slides away and fades once released. The tracker owns the set of
//! in-flight bars and purges them after their animation budget runs
//! out; rendering reads the set each frame.

use crate::keyboard::Key;

/// Length of the slide animation after release, in ms
pub const SLIDE_MS: u64 = 3000;

/// A released note is purged this long after its release
pub const REMOVE_AFTER_RELEASE_MS: u64 = 3500;

/// Bar growth stops after this much held time, in ms
pub const MAX_GROW_MS: u64 = 2000;

/// Fraction of the slide window over which opacity fades to zero
const FADE_PORTION: f64 = 0.25;

/// Bar color, chosen at spawn time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteColor {
    /// Live press on a white key
    White,
    /// Live press on a black key
    Black,
    /// Simulated press during replay
    Replay,
}

impl NoteColor {
    /// Color for a live press on `key`
    pub fn for_key(key: &Key) -> Self {
        if key.is_black {
            NoteColor::Black
        } else {
            NoteColor::White
        }
    }
}

/// Animation phase of a visual note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePhase {
    /// Key still held, bar growing
    Growing,
    /// Released, sliding away
    Sliding,
    /// Slide finished, waiting to be purged
    Faded,
}

/// A single on-screen note bar
#[derive(Debug, Clone, PartialEq)]
pub struct VisualNote {
    /// Unique id, monotonically increasing
    pub id: u64,
    /// Keyboard position of the owning key
    pub key_id: usize,
    /// Left edge in white-key units, copied from the key
    pub left: f64,
    /// Width in white-key units, copied from the key
    pub width: f64,
    /// App-clock ms at which the bar appeared
    pub spawned_ms: u64,
    /// Held time in ms; None while the key is still down
    pub duration_ms: Option<u64>,
    /// Bar color
    pub color: NoteColor,
}

impl VisualNote {
    /// Whether the owning key is still held
    pub fn is_growing(&self) -> bool {
        self.duration_ms.is_none()
    }

    /// Time the key has been (or was) held, in ms
    pub fn held_ms(&self, now_ms: u64) -> u64 {
        match self.duration_ms {
            Some(duration) => duration,
            None => now_ms.saturating_sub(self.spawned_ms),
        }
    }

    /// Held time clamped to the growth ceiling; drives bar height
    pub fn growth_ms(&self, now_ms: u64) -> u64 {
        self.held_ms(now_ms).min(MAX_GROW_MS)
    }

    /// Progress through the slide animation, 0.0 to 1.0.
    ///
    /// Stays at 0.0 until the note is released.
    pub fn slide_progress(&self, now_ms: u64) -> f64 {
        let duration = match self.duration_ms {
            Some(duration) => duration,
            None => return 0.0,
        };

        let released_at = self.spawned_ms + duration;
        let sliding = now_ms.saturating_sub(released_at);
        (sliding as f64 / SLIDE_MS as f64).clamp(0.0, 1.0)
    }

    /// Opacity, 1.0 to 0.0. Fades linearly over the final quarter of
    /// the slide.
    pub fn opacity(&self, now_ms: u64) -> f64 {
        let progress = self.slide_progress(now_ms);
        if progress < 1.0 - FADE_PORTION {
            1.0
        } else {
            ((1.0 - progress) / FADE_PORTION).clamp(0.0, 1.0)
        }
    }

    /// Current animation phase
    pub fn phase(&self, now_ms: u64) -> NotePhase {
        if self.is_growing() {
            NotePhase::Growing
        } else if self.slide_progress(now_ms) < 1.0 {
            NotePhase::Sliding
        } else {
            NotePhase::Faded
        }
    }

    /// Whether the note is past its animation budget
    fn is_expired(&self, now_ms: u64) -> bool {
        match self.duration_ms {
            Some(duration) => {
                now_ms.saturating_sub(self.spawned_ms) > duration + REMOVE_AFTER_RELEASE_MS
            }
            None => false,
        }
    }
}

/// Owns the set of in-flight visual notes
pub struct NoteTracker {
    /// Notes in spawn order
    notes: Vec<VisualNote>,
    /// Next note id
    next_id: u64,
}

impl NoteTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            notes: Vec::new(),
            next_id: 0,
        }
    }

    /// All in-flight notes in spawn order
    pub fn notes(&self) -> &[VisualNote] {
        &self.notes
    }

    /// Number of in-flight notes
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether no notes are in flight
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Spawn a growing bar for a live press, returning its id
    pub fn spawn(&mut self, key: &Key, color: NoteColor, now_ms: u64) -> u64 {
        self.push(key, color, None, now_ms)
    }

    /// Spawn a bar whose held time is already known (replay), returning
    /// its id
    pub fn spawn_with_duration(
        &mut self,
        key: &Key,
        color: NoteColor,
        duration_ms: u64,
        now_ms: u64,
    ) -> u64 {
        self.push(key, color, Some(duration_ms), now_ms)
    }

    fn push(&mut self, key: &Key, color: NoteColor, duration_ms: Option<u64>, now_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.notes.push(VisualNote {
            id,
            key_id: key.id,
            left: key.left,
            width: key.width,
            spawned_ms: now_ms,
            duration_ms,
            color,
        });

        id
    }

    /// Release the newest growing note for `key_id`, fixing its held
    /// time. Returns the released note's id, or None if nothing on that
    /// key was growing.
    pub fn release(&mut self, key_id: usize, now_ms: u64) -> Option<u64> {
        let note = self
            .notes
            .iter_mut()
            .rev()
            .find(|n| n.key_id == key_id && n.is_growing())?;

        note.duration_ms = Some(now_ms.saturating_sub(note.spawned_ms));
        Some(note.id)
    }

    /// Release every growing note, e.g. when a replay is cancelled
    pub fn release_all(&mut self, now_ms: u64) {
        for note in self.notes.iter_mut().filter(|n| n.is_growing()) {
            note.duration_ms = Some(now_ms.saturating_sub(note.spawned_ms));
        }
    }

    /// Purge notes past their animation budget.
    ///
    /// Growing notes are never purged. Safe to call at any cadence;
    /// skipping sweeps only delays reclamation.
    pub fn sweep(&mut self, now_ms: u64) {
        self.notes.retain(|n| !n.is_expired(now_ms));
    }

    /// Drop all notes immediately
    pub fn clear(&mut self) {
        self.notes.clear();
    }
}

impl Default for NoteTracker {
    fn default() -> Self {
        Self::new()
    }
}
