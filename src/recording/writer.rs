// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file export.
//!
//! Encodes a recorded performance as a single-track format 1 file at a
//! fixed 480 ticks per quarter note. The byte layout is header chunk,
//! track chunk header, then a delta-time event stream closed by an
//! end-of-track marker.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::midi::messages;

use super::recorder::RecordedNote;

/// Ticks per quarter note written into the header
pub const TICKS_PER_QUARTER: u16 = 480;

/// Velocity substituted for notes recorded without one
pub const DEFAULT_EXPORT_VELOCITY: u8 = 64;

/// MIME type of the exported file
pub const MIDI_MIME_TYPE: &str = "audio/midi";

/// Convert a millisecond offset to ticks, rounded to nearest
pub fn ms_to_ticks(ms: u64) -> u64 {
    (ms * TICKS_PER_QUARTER as u64 + 500) / 1000
}

/// Suggested name for an exported file, stamped with the current time
pub fn suggested_filename() -> String {
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("piano-recording-{}.mid", epoch_ms)
}

/// A timed channel event in the track
#[derive(Debug, Clone)]
struct TrackEvent {
    /// Absolute tick
    tick: u64,
    /// Status and data bytes
    data: [u8; 3],
}

impl TrackEvent {
    fn note_on(tick: u64, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            data: [messages::NOTE_ON, note & 0x7F, velocity & 0x7F],
        }
    }

    fn note_off(tick: u64, note: u8) -> Self {
        Self {
            tick,
            data: [messages::NOTE_OFF, note & 0x7F, 0],
        }
    }
}

/// MIDI file writer
pub struct MidiFileWriter {
    /// Ticks per quarter note
    division: u16,
}

impl MidiFileWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self {
            division: TICKS_PER_QUARTER,
        }
    }

    /// Get division (ticks per quarter note)
    pub fn division(&self) -> u16 {
        self.division
    }

    /// Encode a performance to bytes
    pub fn encode(&self, notes: &[RecordedNote]) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, notes)
            .expect("Write to vec should not fail");
        buffer
    }

    /// Write a performance to a file
    pub fn export<P: AsRef<Path>>(&self, path: P, notes: &[RecordedNote]) -> io::Result<()> {
        let mut file = File::create(path)?;
        self.write(&mut file, notes)
    }

    /// Write MIDI data to a writer
    pub fn write<W: Write>(&self, writer: &mut W, notes: &[RecordedNote]) -> io::Result<()> {
        let events = self.collect_events(notes);
        self.write_header(writer)?;
        self.write_track(writer, &events)
    }

    /// Expand notes into note-on/note-off events ordered by tick.
    ///
    /// The sort is stable, so events landing on the same tick keep the
    /// order they were derived in.
    fn collect_events(&self, notes: &[RecordedNote]) -> Vec<TrackEvent> {
        let mut events = Vec::with_capacity(notes.len() * 2);

        for note in notes {
            let velocity = if note.velocity == 0 {
                DEFAULT_EXPORT_VELOCITY
            } else {
                note.velocity
            };
            events.push(TrackEvent::note_on(
                ms_to_ticks(note.start_ms),
                note.note,
                velocity,
            ));
            events.push(TrackEvent::note_off(ms_to_ticks(note.end_ms()), note.note));
        }

        events.sort_by_key(|e| e.tick);
        events
    }

    /// Write MIDI file header chunk
    fn write_header<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // MThd
        writer.write_all(b"MThd")?;
        // Chunk length (always 6)
        writer.write_all(&[0, 0, 0, 6])?;
        // Format 1
        writer.write_all(&1u16.to_be_bytes())?;
        // One track
        writer.write_all(&1u16.to_be_bytes())?;
        // Division
        writer.write_all(&self.division.to_be_bytes())?;
        Ok(())
    }

    /// Write the track chunk
    fn write_track<W: Write>(&self, writer: &mut W, events: &[TrackEvent]) -> io::Result<()> {
        // Build track data as a delta-time stream
        let mut track_data = Vec::new();
        let mut last_tick = 0u64;

        for event in events {
            let delta = event.tick.saturating_sub(last_tick);
            self.write_variable_length(&mut track_data, delta as u32)?;
            track_data.extend_from_slice(&event.data);
            last_tick = event.tick;
        }

        // End of track
        self.write_variable_length(&mut track_data, 0)?;
        track_data.extend_from_slice(&[messages::META, messages::META_END_OF_TRACK, 0x00]);

        // MTrk
        writer.write_all(b"MTrk")?;
        // Track length
        let length = track_data.len() as u32;
        writer.write_all(&length.to_be_bytes())?;
        // Track data
        writer.write_all(&track_data)?;

        Ok(())
    }

    /// Write variable-length quantity
    fn write_variable_length<W: Write>(&self, writer: &mut W, mut value: u32) -> io::Result<()> {
        let mut bytes = Vec::new();

        bytes.push((value & 0x7F) as u8);
        value >>= 7;

        while value > 0 {
            bytes.push((value & 0x7F) as u8 | 0x80);
            value >>= 7;
        }

        bytes.reverse();
        writer.write_all(&bytes)
    }
}

impl Default for MidiFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode a VLQ from the front of a slice, returning (value, bytes read)
    fn decode_variable_length(bytes: &[u8]) -> (u32, usize) {
        let mut value = 0u32;
        let mut read = 0;
        for &b in bytes {
            value = (value << 7) | (b & 0x7F) as u32;
            read += 1;
            if b & 0x80 == 0 {
                break;
            }
        }
        (value, read)
    }

    /// Parse track data into (tick, status, pitch) triples, dropping the
    /// end-of-track marker
    fn parse_track_events(track_data: &[u8]) -> Vec<(u64, u8, u8)> {
        let mut events = Vec::new();
        let mut tick = 0u64;
        let mut pos = 0;

        while pos < track_data.len() {
            let (delta, read) = decode_variable_length(&track_data[pos..]);
            pos += read;
            tick += delta as u64;

            if track_data[pos] == 0xFF {
                break;
            }
            events.push((tick, track_data[pos], track_data[pos + 1]));
            pos += 3;
        }

        events
    }

    #[test]
    fn test_writer_creation() {
        let writer = MidiFileWriter::new();
        assert_eq!(writer.division(), 480);
    }

    #[test]
    fn test_ms_to_ticks_rounding() {
        assert_eq!(ms_to_ticks(0), 0);
        assert_eq!(ms_to_ticks(1), 0); // 0.48 rounds down
        assert_eq!(ms_to_ticks(2), 1); // 0.96 rounds up
        assert_eq!(ms_to_ticks(500), 240);
        assert_eq!(ms_to_ticks(1000), 480);
        assert_eq!(ms_to_ticks(2000), 960);
    }

    #[test]
    fn test_single_note_file_layout() {
        let writer = MidiFileWriter::new();
        let notes = vec![RecordedNote::new(39, 60, 64, 0, 500)];

        let bytes = writer.encode(&notes);

        let expected: Vec<u8> = vec![
            // MThd, length 6, format 1, one track, division 480
            0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x01, 0x01, 0xE0,
            // MTrk, length 13
            0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x0D,
            // delta 0, note on C4 velocity 64
            0x00, 0x90, 0x3C, 0x40,
            // delta 240, note off C4
            0x81, 0x70, 0x80, 0x3C, 0x00,
            // delta 0, end of track
            0x00, 0xFF, 0x2F, 0x00,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_empty_performance_is_valid_file() {
        let writer = MidiFileWriter::new();
        let bytes = writer.encode(&[]);

        let expected: Vec<u8> = vec![
            0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x01, 0x01, 0xE0,
            0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x04, 0x00, 0xFF, 0x2F, 0x00,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_variable_length() {
        let writer = MidiFileWriter::new();
        let mut buffer = Vec::new();

        writer.write_variable_length(&mut buffer, 0).unwrap();
        assert_eq!(buffer, vec![0x00]);

        buffer.clear();
        writer.write_variable_length(&mut buffer, 127).unwrap();
        assert_eq!(buffer, vec![0x7F]);

        buffer.clear();
        writer.write_variable_length(&mut buffer, 128).unwrap();
        assert_eq!(buffer, vec![0x81, 0x00]);

        buffer.clear();
        writer.write_variable_length(&mut buffer, 240).unwrap();
        assert_eq!(buffer, vec![0x81, 0x70]);

        buffer.clear();
        writer.write_variable_length(&mut buffer, 16383).unwrap();
        assert_eq!(buffer, vec![0xFF, 0x7F]);

        buffer.clear();
        writer.write_variable_length(&mut buffer, 16384).unwrap();
        assert_eq!(buffer, vec![0x81, 0x80, 0x00]);
    }

    #[test]
    fn test_variable_length_round_trip() {
        let writer = MidiFileWriter::new();

        for value in [0u32, 127, 128, 16383, 16384, 2_097_151] {
            let mut buffer = Vec::new();
            writer.write_variable_length(&mut buffer, value).unwrap();

            let (decoded, read) = decode_variable_length(&buffer);
            assert_eq!(decoded, value);
            assert_eq!(read, buffer.len());
        }
    }

    #[test]
    fn test_zero_velocity_exports_as_default() {
        let writer = MidiFileWriter::new();
        let notes = vec![RecordedNote::new(39, 60, 0, 0, 500)];

        let bytes = writer.encode(&notes);

        // Track data starts with delta 0, then the note-on event
        assert_eq!(bytes[23], 0x90);
        assert_eq!(bytes[25], DEFAULT_EXPORT_VELOCITY);
    }

    #[test]
    fn test_event_ordering_preserves_insertion_on_ties() {
        let writer = MidiFileWriter::new();

        // Chord: both notes start together and end together
        let notes = vec![
            RecordedNote::new(39, 60, 100, 0, 1000),
            RecordedNote::new(43, 64, 100, 0, 1000),
        ];

        let bytes = writer.encode(&notes);
        let events = parse_track_events(&bytes[22..]);

        assert_eq!(
            events,
            vec![
                (0, 0x90, 60),
                (0, 0x90, 64),
                (480, 0x80, 60),
                (480, 0x80, 64),
            ]
        );
    }

    #[test]
    fn test_note_off_before_later_note_on_at_same_tick() {
        let writer = MidiFileWriter::new();

        // First note ends exactly where the second starts
        let notes = vec![
            RecordedNote::new(39, 60, 100, 0, 500),
            RecordedNote::new(43, 64, 100, 500, 500),
        ];

        let bytes = writer.encode(&notes);
        let events = parse_track_events(&bytes[22..]);

        assert_eq!(
            events,
            vec![
                (0, 0x90, 60),
                (240, 0x80, 60),
                (240, 0x90, 64),
                (480, 0x80, 64),
            ]
        );
    }

    #[test]
    fn test_track_length_matches_contents() {
        let writer = MidiFileWriter::new();
        let notes = vec![
            RecordedNote::new(0, 21, 80, 0, 250),
            RecordedNote::new(87, 108, 127, 16000, 3000),
        ];

        let bytes = writer.encode(&notes);

        assert_eq!(&bytes[14..18], b"MTrk");
        let declared = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]) as usize;
        assert_eq!(declared, bytes.len() - 22);
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mid");

        let writer = MidiFileWriter::new();
        let notes = vec![RecordedNote::new(39, 60, 100, 0, 500)];
        writer.export(&path, &notes).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(bytes, writer.encode(&notes));
    }

    #[test]
    fn test_suggested_filename() {
        let name = suggested_filename();
        assert!(name.starts_with("piano-recording-"));
        assert!(name.ends_with(".mid"));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(MIDI_MIME_TYPE, "audio/midi");
    }
}
