// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI message parsing and input handling.
//!
//! Raw bytes arrive from an external controller via `input`; the parsed
//! messages drive the piano exactly like computer-keyboard presses.

pub mod input;

pub use input::{list_ports, MidiInputHandler};

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;

    // Meta events (MIDI file only)
    pub const META: u8 = 0xFF;
    pub const META_END_OF_TRACK: u8 = 0x2F;
}

/// Parsed MIDI message types
#[derive(Debug, Clone, PartialEq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Unknown/unparsed message
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let status = data[0];
        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match msg_type {
            messages::NOTE_OFF if data.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            messages::NOTE_ON if data.len() >= 3 => {
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is equivalent to Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: data[1] & 0x7F,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: data[1] & 0x7F,
                        velocity,
                    })
                }
            }
            messages::CONTROL_CHANGE if data.len() >= 3 => Some(MidiMessage::ControlChange {
                channel,
                controller: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            _ => Some(MidiMessage::Unknown(data.to_vec())),
        }
    }
}
