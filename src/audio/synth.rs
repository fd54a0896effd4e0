// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Software tone synthesis.
//!
//! A small polyphonic additive synth that stands in for a sampled piano.
//! Each voice runs a phase-accumulator oscillator with a short harmonic
//! stack and a percussive envelope, rendered straight into the cpal
//! output buffer.

use std::f32::consts::TAU;

/// Maximum simultaneous voices before stealing kicks in
pub const MAX_VOICES: usize = 32;

/// Relative amplitudes of the oscillator harmonics
const HARMONICS: [f32; 4] = [1.0, 0.4, 0.2, 0.1];

/// Envelope stages for a single voice
#[derive(Debug, Clone, Copy, PartialEq)]
enum EnvelopeStage {
    Attack,
    Decay,
    Release,
    Idle,
}

/// A single sounding note
struct Voice {
    /// MIDI note number
    note: u8,
    /// Oscillator frequency in Hz
    frequency: f32,
    /// Normalized phase in [0, 1)
    phase: f32,
    /// Velocity-derived amplitude (0.0 - 1.0)
    amplitude: f32,
    /// Current envelope level
    level: f32,
    /// Level captured when release began
    release_level: f32,
    /// Current envelope stage
    stage: EnvelopeStage,
}

impl Voice {
    fn new(note: u8, velocity: u8) -> Self {
        let frequency = 440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0);
        Self {
            note,
            frequency,
            phase: 0.0,
            amplitude: (velocity as f32 / 127.0).clamp(0.0, 1.0),
            level: 0.0,
            release_level: 0.0,
            stage: EnvelopeStage::Attack,
        }
    }

    /// Move the voice into its release stage
    fn release(&mut self) {
        if self.stage != EnvelopeStage::Release && self.stage != EnvelopeStage::Idle {
            self.release_level = self.level;
            self.stage = EnvelopeStage::Release;
        }
    }

    fn is_finished(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    /// Advance the envelope by one sample
    #[inline]
    fn envelope_sample(&mut self, attack_rate: f32, decay_factor: f32, release_rate: f32) -> f32 {
        match self.stage {
            EnvelopeStage::Attack => {
                self.level += attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
                self.level
            }
            EnvelopeStage::Decay => {
                // Exponential decay toward silence, like a struck string
                self.level *= decay_factor;
                if self.level < 0.0005 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
                self.level
            }
            EnvelopeStage::Release => {
                self.level -= self.release_level * release_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
                self.level
            }
            EnvelopeStage::Idle => 0.0,
        }
    }

    /// Produce the next mono sample for this voice
    #[inline]
    fn next_sample(
        &mut self,
        sample_rate: f32,
        attack_rate: f32,
        decay_factor: f32,
        release_rate: f32,
    ) -> f32 {
        let env = self.envelope_sample(attack_rate, decay_factor, release_rate);
        if env <= 0.0 {
            return 0.0;
        }

        let mut sample = 0.0;
        for (i, amp) in HARMONICS.iter().enumerate() {
            let harmonic_phase = self.phase * (i as f32 + 1.0);
            sample += (harmonic_phase * TAU).sin() * amp;
        }

        let inc = self.frequency / sample_rate;
        self.phase = (self.phase + inc).fract();

        sample * env * self.amplitude
    }
}

/// Polyphonic tone synth rendering interleaved f32 audio
pub struct ToneSynth {
    /// Active voices
    voices: Vec<Voice>,
    /// Master gain (0.0 - 1.0)
    gain: f32,
    /// Sample rate in Hz
    sample_rate: f64,
    /// Per-sample attack increment
    attack_rate: f32,
    /// Per-sample decay multiplier
    decay_factor: f32,
    /// Per-sample release decrement (fraction of release level)
    release_rate: f32,
}

impl ToneSynth {
    /// Create a new synth at 44.1 kHz
    pub fn new() -> Self {
        Self::with_sample_rate(44100.0)
    }

    /// Create with custom sample rate
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        let mut synth = Self {
            voices: Vec::with_capacity(MAX_VOICES),
            gain: 0.5,
            sample_rate,
            attack_rate: 0.0,
            decay_factor: 0.0,
            release_rate: 0.0,
        };
        synth.set_sample_rate(sample_rate);
        synth
    }

    /// Start a voice for the given note
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(note);
            return;
        }

        // Retrigger rather than stack when the note is already sounding
        if let Some(voice) = self.voices.iter_mut().find(|v| v.note == note) {
            *voice = Voice::new(note, velocity);
            return;
        }

        if self.voices.len() >= MAX_VOICES {
            self.steal_voice();
        }
        self.voices.push(Voice::new(note, velocity));
    }

    /// Release the voice for the given note
    pub fn note_off(&mut self, note: u8) {
        for voice in self.voices.iter_mut().filter(|v| v.note == note) {
            voice.release();
        }
    }

    /// Release every active voice
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.release();
        }
    }

    /// Drop the quietest voice to make room for a new one
    fn steal_voice(&mut self) {
        let quietest = self
            .voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.level * a.amplitude)
                    .partial_cmp(&(b.level * b.amplitude))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        if let Some(i) = quietest {
            self.voices.swap_remove(i);
        }
    }

    /// Render audio into an interleaved buffer
    ///
    /// The buffer is expected to be zeroed; voices are mixed in additively.
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }

        let sr = self.sample_rate as f32;
        let frames = buffer.len() / channels;

        for frame in 0..frames {
            let mut mixed = 0.0;
            for voice in self.voices.iter_mut() {
                mixed += voice.next_sample(
                    sr,
                    self.attack_rate,
                    self.decay_factor,
                    self.release_rate,
                );
            }
            let sample = (mixed * self.gain).clamp(-1.0, 1.0);
            for ch in 0..channels {
                buffer[frame * channels + ch] += sample;
            }
        }

        self.voices.retain(|v| !v.is_finished());
    }

    /// Set master gain (0.0 - 1.0)
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Get current gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Change the sample rate and recompute the envelope constants
    ///
    /// Used when the output device could not honor the requested rate.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        let sr = sample_rate as f32;
        // Attack 5ms, decay to silence over ~4s, release ~80ms
        self.sample_rate = sample_rate;
        self.attack_rate = 1.0 / (0.005 * sr).max(1.0);
        self.decay_factor = (-1.0 / (0.6 * sr)).exp();
        self.release_rate = 1.0 / (0.08 * sr).max(1.0);
    }

    /// Number of currently sounding voices
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Silence and drop all voices immediately
    pub fn reset(&mut self) {
        self.voices.clear();
    }
}

impl Default for ToneSynth {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synth_creation() {
        let synth = ToneSynth::new();
        assert_eq!(synth.sample_rate(), 44100.0);
        assert_eq!(synth.active_voices(), 0);
        assert!((synth.gain() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_set_sample_rate_keeps_rendering() {
        let mut synth = ToneSynth::new();
        synth.set_sample_rate(48000.0);
        assert_eq!(synth.sample_rate(), 48000.0);

        synth.note_on(60, 100);
        let mut buffer = vec![0.0f32; 480 * 2];
        synth.render(&mut buffer, 2);
        assert!(buffer.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn test_gain_clamping() {
        let mut synth = ToneSynth::new();

        synth.set_gain(0.8);
        assert!((synth.gain() - 0.8).abs() < 0.01);

        synth.set_gain(1.5);
        assert!((synth.gain() - 1.0).abs() < 0.01);

        synth.set_gain(-0.5);
        assert!((synth.gain() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_note_on_adds_voice() {
        let mut synth = ToneSynth::new();
        synth.note_on(60, 100);
        assert_eq!(synth.active_voices(), 1);

        synth.note_on(64, 100);
        assert_eq!(synth.active_voices(), 2);
    }

    #[test]
    fn test_note_on_retriggers_same_note() {
        let mut synth = ToneSynth::new();
        synth.note_on(60, 100);
        synth.note_on(60, 80);
        assert_eq!(synth.active_voices(), 1);
    }

    #[test]
    fn test_note_on_zero_velocity_is_note_off() {
        let mut synth = ToneSynth::new();
        synth.note_on(60, 100);
        synth.note_on(60, 0);

        // Voice remains until the release tail renders out
        let mut buffer = vec![0.0f32; 44100 * 2];
        synth.render(&mut buffer, 2);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_render_produces_audio() {
        let mut synth = ToneSynth::new();
        synth.note_on(69, 127);

        let mut buffer = vec![0.0f32; 512 * 2];
        synth.render(&mut buffer, 2);

        let peak = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.0);
    }

    #[test]
    fn test_render_silent_without_voices() {
        let mut synth = ToneSynth::new();
        let mut buffer = vec![0.0f32; 512 * 2];
        synth.render(&mut buffer, 2);
        assert!(buffer.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_release_tail_ends() {
        let mut synth = ToneSynth::new();
        synth.note_on(60, 100);
        synth.note_off(60);

        // A second of audio is far longer than the release tail
        let mut buffer = vec![0.0f32; 44100 * 2];
        synth.render(&mut buffer, 2);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_voice_stealing_caps_polyphony() {
        let mut synth = ToneSynth::new();
        for note in 0..40 {
            synth.note_on(21 + note, 100);
        }
        assert!(synth.active_voices() <= MAX_VOICES);
    }

    #[test]
    fn test_all_notes_off_releases_everything() {
        let mut synth = ToneSynth::new();
        synth.note_on(60, 100);
        synth.note_on(64, 100);
        synth.note_on(67, 100);
        synth.all_notes_off();

        let mut buffer = vec![0.0f32; 44100 * 2];
        synth.render(&mut buffer, 2);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_reset_drops_voices_immediately() {
        let mut synth = ToneSynth::new();
        synth.note_on(60, 100);
        synth.reset();
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_output_stays_in_range() {
        let mut synth = ToneSynth::new();
        synth.set_gain(1.0);
        for note in [48, 52, 55, 60, 64, 67, 72] {
            synth.note_on(note, 127);
        }

        let mut buffer = vec![0.0f32; 4096 * 2];
        synth.render(&mut buffer, 2);
        assert!(buffer.iter().all(|s| s.abs() <= 1.0));
    }
}
