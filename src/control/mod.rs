// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for computer-keyboard input.
//!
//! This module provides:
//! - Keyboard shortcut handling (transport, export, octave, UI)
//! - The two-row note mapping that turns typing keys into piano keys

pub mod keyboard;
pub mod notes;

pub use keyboard::{BindingCategory, KeyBinding, KeyboardController, Shortcut};
pub use notes::{NoteMap, DEFAULT_BASE_OCTAVE, MAX_BASE_OCTAVE, MIN_BASE_OCTAVE};

/// Action that can be triggered by a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    // Transport
    /// Start or stop recording
    ToggleRecord,
    /// Start or stop replaying the recording
    ToggleReplay,

    // File
    /// Export the recording as a MIDI file
    Export,
    /// Clear the recording
    ClearRecording,

    // Octave
    /// Shift the playing rows down an octave
    OctaveDown,
    /// Shift the playing rows up an octave
    OctaveUp,

    // UI
    /// Toggle help display
    ToggleHelp,
    /// Quit application
    Quit,
}

impl ControlAction {
    /// Check if this is a transport action
    pub fn is_transport(&self) -> bool {
        matches!(self, ControlAction::ToggleRecord | ControlAction::ToggleReplay)
    }
}
