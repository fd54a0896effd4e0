// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance capture.
//!
//! Turns press/release events into a list of notes with start offsets and
//! durations relative to the recording epoch. The recorder never reads the
//! clock itself; callers pass the app-clock time into every mutation.

use std::collections::HashMap;

use tracing::debug;

/// Shortest note the recorder will store, in milliseconds.
///
/// A tap shorter than this would be inaudible on replay and collapse to a
/// near-zero-length event on export.
pub const MIN_NOTE_MS: u64 = 100;

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Not recording
    Idle,
    /// Actively recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        RecordingState::Idle
    }
}

/// A completed note in a recorded performance
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNote {
    /// Keyboard position (0-87)
    pub key_id: usize,
    /// MIDI note number (21-108)
    pub note: u8,
    /// Velocity (0-127)
    pub velocity: u8,
    /// Start in ms relative to the recording epoch
    pub start_ms: u64,
    /// Held time in ms (never below `MIN_NOTE_MS`)
    pub duration_ms: u64,
}

impl RecordedNote {
    /// Create a new recorded note
    pub fn new(key_id: usize, note: u8, velocity: u8, start_ms: u64, duration_ms: u64) -> Self {
        Self {
            key_id,
            note,
            velocity,
            start_ms,
            duration_ms,
        }
    }

    /// End of the note in ms relative to the recording epoch
    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }
}

/// A note that is currently held (press received, waiting for release)
#[derive(Debug, Clone)]
struct HeldNote {
    note: u8,
    velocity: u8,
    start_ms: u64,
}

/// Captures a performance as timestamped notes.
///
/// One recording take at a time; `start` replaces whatever the previous
/// take left behind.
pub struct PerformanceRecorder {
    /// Current state
    state: RecordingState,
    /// Completed notes, in release order
    notes: Vec<RecordedNote>,
    /// Held notes by key id (press received, waiting for release)
    held: HashMap<usize, HeldNote>,
    /// App-clock ms at which the current take started
    epoch_ms: u64,
}

impl PerformanceRecorder {
    /// Create a new recorder
    pub fn new() -> Self {
        Self {
            state: RecordingState::Idle,
            notes: Vec::new(),
            held: HashMap::new(),
            epoch_ms: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Get recorded notes
    pub fn notes(&self) -> &[RecordedNote] {
        &self.notes
    }

    /// Take recorded notes (clears internal buffer)
    pub fn take_notes(&mut self) -> Vec<RecordedNote> {
        std::mem::take(&mut self.notes)
    }

    /// Get number of recorded notes
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Time recorded so far, in ms
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        if self.is_recording() {
            now_ms.saturating_sub(self.epoch_ms)
        } else {
            0
        }
    }

    /// Start a new take at `now_ms`, discarding the previous one
    pub fn start(&mut self, now_ms: u64) {
        self.notes.clear();
        self.held.clear();
        self.epoch_ms = now_ms;
        self.state = RecordingState::Recording;
        debug!("Recording started");
    }

    /// Stop the take, flushing still-held notes as if released at `now_ms`
    pub fn stop(&mut self, now_ms: u64) {
        if self.state != RecordingState::Recording {
            return;
        }

        let mut flushed: Vec<RecordedNote> = self
            .held
            .drain()
            .map(|(key_id, held)| {
                let duration = now_ms
                    .saturating_sub(self.epoch_ms)
                    .saturating_sub(held.start_ms)
                    .max(MIN_NOTE_MS);
                RecordedNote::new(key_id, held.note, held.velocity, held.start_ms, duration)
            })
            .collect();

        // HashMap drain order is arbitrary; keep the take ordered
        flushed.sort_by_key(|n| n.start_ms);
        self.notes.append(&mut flushed);

        self.state = RecordingState::Idle;
        debug!("Recording stopped with {} notes", self.notes.len());
    }

    /// Record a key press. Ignored when idle or when the key is already held.
    pub fn note_on(&mut self, key_id: usize, note: u8, velocity: u8, now_ms: u64) {
        if self.state != RecordingState::Recording {
            return;
        }

        if self.held.contains_key(&key_id) {
            return;
        }

        let start_ms = now_ms.saturating_sub(self.epoch_ms);
        self.held.insert(
            key_id,
            HeldNote {
                note,
                velocity,
                start_ms,
            },
        );
    }

    /// Record a key release. Ignored when idle or when the key is not held.
    pub fn note_off(&mut self, key_id: usize, now_ms: u64) {
        if self.state != RecordingState::Recording {
            return;
        }

        if let Some(held) = self.held.remove(&key_id) {
            let duration = now_ms
                .saturating_sub(self.epoch_ms)
                .saturating_sub(held.start_ms)
                .max(MIN_NOTE_MS);
            self.notes.push(RecordedNote::new(
                key_id,
                held.note,
                held.velocity,
                held.start_ms,
                duration,
            ));
        }
    }

    /// Discard all recorded and held notes unconditionally
    pub fn clear(&mut self) {
        self.notes.clear();
        self.held.clear();
    }
}

impl Default for PerformanceRecorder {
    fn default() -> Self {
        Self::new()
    }
}
