// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for the ivory piano.
//!
//! This module provides the YAML configuration file with defaults for
//! MIDI port selection, audio settings, export location, and the
//! computer-keyboard playing behavior.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::control::{DEFAULT_BASE_OCTAVE, MAX_BASE_OCTAVE, MIN_BASE_OCTAVE};

/// Root configuration for the piano
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PianoConfig {
    /// MIDI input port to connect to (index or name substring)
    #[serde(default)]
    pub midi_port: Option<String>,
    /// Velocity used for computer-keyboard presses (1-127)
    #[serde(default = "default_velocity")]
    pub default_velocity: u8,
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioSettings,
    /// Directory exported MIDI files are written to
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    /// Auto-release window for computer-keyboard presses in ms
    #[serde(default = "default_key_sustain_ms")]
    pub key_sustain_ms: u64,
    /// Base octave for the playing rows
    #[serde(default = "default_base_octave")]
    pub base_octave: u8,
}

/// Audio output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioSettings {
    /// Whether audio output is enabled
    #[serde(default = "default_audio_enabled")]
    pub enabled: bool,
    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Buffer size in frames
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
}

fn default_velocity() -> u8 {
    100
}
fn default_export_dir() -> String {
    ".".to_string()
}
fn default_key_sustain_ms() -> u64 {
    300
}
fn default_base_octave() -> u8 {
    DEFAULT_BASE_OCTAVE
}
fn default_audio_enabled() -> bool {
    true
}
fn default_sample_rate() -> u32 {
    44100
}
fn default_buffer_size() -> u32 {
    512
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: default_audio_enabled(),
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            midi_port: None,
            default_velocity: default_velocity(),
            audio: AudioSettings::default(),
            export_dir: default_export_dir(),
            key_sustain_ms: default_key_sustain_ms(),
            base_octave: default_base_octave(),
        }
    }
}

impl PianoConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Load a configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Clamp out-of-range values, returning a message per adjustment
    pub fn validate(&mut self) -> Vec<String> {
        let mut adjustments = Vec::new();

        if self.default_velocity == 0 || self.default_velocity > 127 {
            let clamped = self.default_velocity.clamp(1, 127);
            adjustments.push(format!(
                "default_velocity {} out of range, using {}",
                self.default_velocity, clamped
            ));
            self.default_velocity = clamped;
        }

        if self.base_octave < MIN_BASE_OCTAVE || self.base_octave > MAX_BASE_OCTAVE {
            let clamped = self.base_octave.clamp(MIN_BASE_OCTAVE, MAX_BASE_OCTAVE);
            adjustments.push(format!(
                "base_octave {} out of range, using {}",
                self.base_octave, clamped
            ));
            self.base_octave = clamped;
        }

        if self.key_sustain_ms < 50 {
            adjustments.push(format!(
                "key_sustain_ms {} too short, using 50",
                self.key_sustain_ms
            ));
            self.key_sustain_ms = 50;
        }

        let clamped_buffer = self.audio.buffer_size.clamp(64, 4096);
        if clamped_buffer != self.audio.buffer_size {
            adjustments.push(format!(
                "audio.buffer_size {} out of range, using {}",
                self.audio.buffer_size, clamped_buffer
            ));
            self.audio.buffer_size = clamped_buffer;
        }

        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192_000 {
            adjustments.push(format!(
                "audio.sample_rate {} unsupported, using {}",
                self.audio.sample_rate,
                default_sample_rate()
            ));
            self.audio.sample_rate = default_sample_rate();
        }

        adjustments
    }
}
