// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio engine for the ivory piano.
//!
//! This module provides:
//! - A built-in polyphonic tone synth
//! - Audio output via cpal
//! - Buffer management and latency control

pub mod output;
pub mod synth;

pub use output::{AudioConfig, AudioOutput};
pub use synth::ToneSynth;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;

/// Audio error types
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// Failed to initialize audio
    #[error("Audio initialization failed: {0}")]
    InitFailed(String),
    /// Failed to start audio stream
    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
    /// No audio device available
    #[error("No audio device available")]
    NoDevice,
}

/// Audio engine combining synth and output
pub struct AudioEngine {
    /// Synth shared with the audio thread
    synth: Arc<Mutex<ToneSynth>>,
    /// Stream handle, kept alive while audio runs
    output: Option<AudioOutput>,
    /// Whether a stream is up
    running: bool,
    /// Requested sample rate, updated to the achieved rate on start
    sample_rate: u32,
    /// Requested buffer size in frames
    buffer_size: u32,
}

impl AudioEngine {
    /// Create a new audio engine
    pub fn new() -> Self {
        Self::with_config(44100, 512)
    }

    /// Create with custom sample rate and buffer size
    pub fn with_config(sample_rate: u32, buffer_size: u32) -> Self {
        Self {
            synth: Arc::new(Mutex::new(ToneSynth::with_sample_rate(sample_rate as f64))),
            output: None,
            running: false,
            sample_rate,
            buffer_size: buffer_size.clamp(64, 4096),
        }
    }

    /// Get synth reference
    pub fn synth(&self) -> Arc<Mutex<ToneSynth>> {
        Arc::clone(&self.synth)
    }

    /// Start audio output
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running {
            return Ok(());
        }

        let requested = AudioConfig {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            channels: 2,
        };

        let render_synth = Arc::clone(&self.synth);
        let output = AudioOutput::new(requested, move |buffer, channels| {
            if let Ok(mut synth) = render_synth.lock() {
                synth.render(buffer, channels);
            }
        })?;

        // The device may have negotiated a different rate or buffer size
        let achieved = *output.config();
        self.buffer_size = achieved.buffer_size;
        if achieved.sample_rate != self.sample_rate {
            self.sample_rate = achieved.sample_rate;
            self.with_synth(|s| s.set_sample_rate(achieved.sample_rate as f64));
        }

        info!(
            "audio output started on {} ({} Hz, {:.1} ms latency)",
            output.device_name().unwrap_or("default"),
            output.sample_rate(),
            output.latency_ms()
        );

        self.output = Some(output);
        self.running = true;
        Ok(())
    }

    /// Stop audio output, dropping the stream
    pub fn stop(&mut self) {
        self.output = None;
        self.running = false;
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Send note on
    pub fn note_on(&self, note: u8, velocity: u8) {
        self.with_synth(|s| s.note_on(note, velocity));
    }

    /// Send note off
    pub fn note_off(&self, note: u8) {
        self.with_synth(|s| s.note_off(note));
    }

    /// Release every sounding voice
    pub fn all_notes_off(&self) {
        self.with_synth(|s| s.all_notes_off());
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_volume(&self, volume: f32) {
        self.with_synth(|s| s.set_gain(volume));
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Run a closure over the synth, skipping it when the lock is poisoned
    fn with_synth(&self, f: impl FnOnce(&mut ToneSynth)) {
        if let Ok(mut synth) = self.synth.lock() {
            f(&mut synth);
        }
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}
