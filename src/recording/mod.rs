// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording and export system.
//!
//! This module provides:
//! - Performance capture as timestamped notes
//! - Standard MIDI file export

pub mod recorder;
pub mod writer;

pub use recorder::{PerformanceRecorder, RecordedNote, RecordingState, MIN_NOTE_MS};
pub use writer::{
    ms_to_ticks, suggested_filename, MidiFileWriter, MIDI_MIME_TYPE, TICKS_PER_QUARTER,
};
