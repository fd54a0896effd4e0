// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! Opens the default output device and drives a render callback from the
//! audio thread. The requested configuration is negotiated against what
//! the device reports: an unsupported sample rate falls back to the
//! device's own rate, and the buffer size is clamped to the supported
//! range. Callers should read back `sample_rate()` after opening.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig, SupportedBufferSize};
use tracing::warn;

use super::AudioError;

/// Audio output configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Frames per callback buffer
    pub buffer_size: u32,
    /// Interleaved channel count
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
        }
    }
}

/// A running audio output stream
pub struct AudioOutput {
    _stream: Stream,
    device_name: Option<String>,
    config: AudioConfig,
}

impl AudioOutput {
    /// Open the default output device and start streaming
    ///
    /// The callback receives a zeroed interleaved buffer and the channel
    /// count on every audio-thread wakeup.
    pub fn new<F>(requested: AudioConfig, mut callback: F) -> Result<Self, AudioError>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let device_name = device.name().ok();

        let (config, stream_config) = negotiate(&device, requested)?;
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    callback(data, channels);
                },
                |err| warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamFailed(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(format!("Failed to start stream: {}", e)))?;

        Ok(Self {
            _stream: stream,
            device_name,
            config,
        })
    }

    /// Get the negotiated configuration
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Sample rate actually in effect
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Get number of channels
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Name of the device the stream runs on
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Calculate latency in milliseconds
    pub fn latency_ms(&self) -> f64 {
        (self.config.buffer_size as f64 / self.config.sample_rate as f64) * 1000.0
    }
}

/// Fit the requested configuration to what the device supports
fn negotiate(
    device: &Device,
    requested: AudioConfig,
) -> Result<(AudioConfig, StreamConfig), AudioError> {
    let default = device
        .default_output_config()
        .map_err(|e| AudioError::InitFailed(format!("Failed to get default config: {}", e)))?;

    let mut achieved = requested;
    if !rate_supported(device, requested.sample_rate) {
        achieved.sample_rate = default.sample_rate().0;
        warn!(
            "device does not support {} Hz, using {} Hz",
            requested.sample_rate, achieved.sample_rate
        );
    }

    let buffer_size = match default.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            achieved.buffer_size = requested.buffer_size.clamp(*min, *max);
            BufferSize::Fixed(achieved.buffer_size)
        }
        SupportedBufferSize::Unknown => BufferSize::Default,
    };

    let stream_config = StreamConfig {
        channels: achieved.channels,
        sample_rate: SampleRate(achieved.sample_rate),
        buffer_size,
    };

    Ok((achieved, stream_config))
}

/// Check whether any supported output range covers the given rate
fn rate_supported(device: &Device, rate: u32) -> bool {
    match device.supported_output_configs() {
        Ok(mut ranges) => {
            ranges.any(|r| r.min_sample_rate().0 <= rate && rate <= r.max_sample_rate().0)
        }
        // Enumeration is unsupported on some hosts; the stream build
        // still validates the rate
        Err(_) => true,
    }
}
