// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Ivory, a terminal piano.
//!
//! An 88-key piano played from the typing rows or an external MIDI
//! keyboard, with performance recording, replay, and standard MIDI
//! file export.

pub mod app;
pub mod audio;
pub mod config;
pub mod control;
pub mod keyboard;
pub mod midi;
pub mod notes;
pub mod playback;
pub mod recording;
pub mod ui;

// Re-export key types
pub use app::{App, PressSource};
pub use config::PianoConfig;
pub use keyboard::Keyboard;
pub use notes::NoteTracker;
pub use playback::ReplayScheduler;
pub use recording::{MidiFileWriter, PerformanceRecorder};
