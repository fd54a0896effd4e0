// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Application state and event handling.
//!
//! The `App` owns every subsystem and the monotonic clock they share.
//! Input arrives as key events and MIDI messages; `tick` advances
//! replay, sustain timers, animation sweeps, and status expiry. All
//! mutations take the current app-clock time so the whole pipeline can
//! be driven with synthetic timestamps in tests.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{info, warn};

use crate::audio::AudioEngine;
use crate::config::PianoConfig;
use crate::control::{ControlAction, KeyboardController, NoteMap};
use crate::keyboard::Keyboard;
use crate::midi::{MidiInputHandler, MidiMessage};
use crate::notes::{NoteColor, NoteTracker, VisualNote};
use crate::playback::{ReplayEvent, ReplayScheduler};
use crate::recording::{suggested_filename, MidiFileWriter, PerformanceRecorder};

/// How often expired visual notes are purged, in ms
pub const SWEEP_INTERVAL_MS: u64 = 250;

/// How long a status message stays on screen, in ms
pub const STATUS_TTL_MS: u64 = 4000;

/// Where a key press came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressSource {
    /// Typed on the computer keyboard
    Keyboard,
    /// Received from a connected MIDI device
    Midi,
    /// Simulated by the replay scheduler; the held time is known up front
    Replay { duration_ms: u64 },
}

/// A key currently held down
#[derive(Debug, Clone, Copy)]
struct PressedKey {
    source: PressSource,
    pressed_ms: u64,
}

/// Top-level application state
pub struct App {
    /// The 88-key table and geometry
    keyboard: Keyboard,
    /// Char-to-note mapping for the typing rows
    note_map: NoteMap,
    /// Shortcut bindings
    controller: KeyboardController,
    /// Performance capture
    recorder: PerformanceRecorder,
    /// Visual note lifecycle
    tracker: NoteTracker,
    /// Replay event queue
    replay: ReplayScheduler,
    /// Tone synthesis and output
    audio: AudioEngine,
    /// External MIDI input
    midi: MidiInputHandler,
    /// Loaded configuration
    config: PianoConfig,
    /// Keys currently held, by key id
    pressed: HashMap<usize, PressedKey>,
    /// App clock epoch
    started: Instant,
    /// App-clock ms of the last tracker sweep
    last_sweep_ms: u64,
    /// Transient status message and when it was set
    status: Option<(String, u64)>,
    /// Whether the terminal delivers real key-release events
    true_release_mode: bool,
    /// Whether the help overlay is shown
    help_visible: bool,
    /// Set when the user asks to quit
    should_quit: bool,
}

impl App {
    /// Build the application from a validated config.
    ///
    /// No devices are opened here; call `start_devices` once the
    /// terminal is set up.
    pub fn new(config: PianoConfig) -> Self {
        let audio = AudioEngine::with_config(config.audio.sample_rate, config.audio.buffer_size);
        let note_map = NoteMap::with_base_octave(config.base_octave);

        Self {
            keyboard: Keyboard::new(),
            note_map,
            controller: KeyboardController::with_defaults(),
            recorder: PerformanceRecorder::new(),
            tracker: NoteTracker::new(),
            replay: ReplayScheduler::new(),
            audio,
            midi: MidiInputHandler::new(),
            config,
            pressed: HashMap::new(),
            started: Instant::now(),
            last_sweep_ms: 0,
            status: None,
            true_release_mode: false,
            help_visible: false,
            should_quit: false,
        }
    }

    /// Milliseconds since the app clock epoch
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Open the audio output and the configured MIDI input.
    ///
    /// Failures degrade rather than abort: without audio the piano is
    /// silent, without MIDI it is keyboard-only.
    pub fn start_devices(&mut self) {
        if self.config.audio.enabled {
            if let Err(e) = self.audio.start() {
                warn!("audio unavailable, running muted: {}", e);
                self.set_status(format!("Audio unavailable: {}", e), self.now_ms());
            }
        } else {
            info!("audio disabled by configuration");
        }

        match self.config.midi_port.clone() {
            Some(port) => {
                // A small integer names a port index, anything else a
                // substring of the port name
                let result = match port.parse::<usize>() {
                    Ok(index) => self.midi.connect_by_index(index),
                    Err(_) => self.midi.connect(&port),
                };
                if let Err(e) = result {
                    warn!("MIDI connect failed: {}", e);
                    self.set_status(format!("MIDI unavailable: {}", e), self.now_ms());
                }
            }
            None => {
                // No port configured; pick up the first one if present
                if let Err(e) = self.midi.connect_by_index(0) {
                    info!("no MIDI input connected: {}", e);
                }
            }
        }
    }

    /// Press a key by keyboard position. No-op while the key is held.
    pub fn press_key(&mut self, key_id: usize, velocity: u8, source: PressSource, now_ms: u64) {
        if self.pressed.contains_key(&key_id) {
            return;
        }

        let key = match self.keyboard.key(key_id) {
            Some(key) => key.clone(),
            None => return,
        };

        self.pressed.insert(
            key_id,
            PressedKey {
                source,
                pressed_ms: now_ms,
            },
        );

        self.audio.note_on(key.midi, velocity);
        self.recorder.note_on(key_id, key.midi, velocity, now_ms);

        match source {
            PressSource::Replay { duration_ms } => {
                self.tracker
                    .spawn_with_duration(&key, NoteColor::Replay, duration_ms, now_ms);
            }
            _ => {
                self.tracker.spawn(&key, NoteColor::for_key(&key), now_ms);
            }
        }
    }

    /// Release a key by keyboard position. No-op if the key is not held.
    pub fn release_key(&mut self, key_id: usize, now_ms: u64) {
        if self.pressed.remove(&key_id).is_none() {
            return;
        }

        if let Some(key) = self.keyboard.key(key_id) {
            self.audio.note_off(key.midi);
        }
        self.recorder.note_off(key_id, now_ms);
        // Replay bars carry their duration from spawn; release only
        // affects growing bars
        self.tracker.release(key_id, now_ms);
    }

    /// Press the key mapped to a typed character. Returns false for
    /// characters outside the note rows.
    pub fn press_char(&mut self, c: char, now_ms: u64) -> bool {
        let midi = match self.note_map.note_for(c) {
            Some(midi) => midi,
            None => return false,
        };
        if let Some(key) = self.keyboard.key_for_midi(midi) {
            let key_id = key.id;
            self.press_key(key_id, self.config.default_velocity, PressSource::Keyboard, now_ms);
            true
        } else {
            false
        }
    }

    /// Release the key mapped to a typed character
    pub fn release_char(&mut self, c: char, now_ms: u64) -> bool {
        let midi = match self.note_map.note_for(c) {
            Some(midi) => midi,
            None => return false,
        };
        if let Some(key) = self.keyboard.key_for_midi(midi) {
            let key_id = key.id;
            self.release_key(key_id, now_ms);
            true
        } else {
            false
        }
    }

    /// Extend the sustain window of a held typed key (key-repeat events)
    pub fn refresh_char(&mut self, c: char, now_ms: u64) {
        let key_id = self
            .note_map
            .note_for(c)
            .and_then(|midi| self.keyboard.key_for_midi(midi))
            .map(|key| key.id);

        if let Some(key_id) = key_id {
            if let Some(held) = self.pressed.get_mut(&key_id) {
                held.pressed_ms = now_ms;
            }
        }
    }

    /// Advance time-driven state: MIDI input, replay, sustain timers,
    /// sweeps, and status expiry
    pub fn tick(&mut self, now_ms: u64) {
        for msg in self.midi.recv_all() {
            match msg {
                MidiMessage::NoteOn { note, velocity, .. } if velocity > 0 => {
                    if let Some(key) = self.keyboard.key_for_midi(note) {
                        let key_id = key.id;
                        self.press_key(key_id, velocity, PressSource::Midi, now_ms);
                    }
                }
                MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. } => {
                    if let Some(key) = self.keyboard.key_for_midi(note) {
                        let key_id = key.id;
                        self.release_key(key_id, now_ms);
                    }
                }
                _ => {}
            }
        }

        for event in self.replay.poll(now_ms) {
            match event {
                ReplayEvent::Press {
                    key_id,
                    velocity,
                    duration_ms,
                    ..
                } => {
                    self.press_key(
                        key_id,
                        velocity,
                        PressSource::Replay { duration_ms },
                        now_ms,
                    );
                }
                ReplayEvent::Release { key_id, .. } => {
                    self.release_key(key_id, now_ms);
                }
            }
        }

        // Terminals without release events get a sustain timer instead
        if !self.true_release_mode {
            let expired: Vec<usize> = self
                .pressed
                .iter()
                .filter(|(_, held)| {
                    held.source == PressSource::Keyboard
                        && now_ms.saturating_sub(held.pressed_ms) >= self.config.key_sustain_ms
                })
                .map(|(&key_id, _)| key_id)
                .collect();
            for key_id in expired {
                self.release_key(key_id, now_ms);
            }
        }

        if now_ms.saturating_sub(self.last_sweep_ms) >= SWEEP_INTERVAL_MS {
            self.tracker.sweep(now_ms);
            self.last_sweep_ms = now_ms;
        }

        if let Some((_, shown_ms)) = self.status {
            if now_ms.saturating_sub(shown_ms) >= STATUS_TTL_MS {
                self.status = None;
            }
        }
    }

    /// Handle a terminal key event
    pub fn handle_key_event(&mut self, event: KeyEvent, now_ms: u64) {
        match event.kind {
            KeyEventKind::Press => {
                if let Some(action) = self.controller.action_for(event.code, event.modifiers) {
                    self.handle_action(action, now_ms);
                    return;
                }
                if let KeyCode::Char(c) = event.code {
                    // Characters arrive already shifted, so '?' may carry a
                    // redundant SHIFT that the binding table does not list
                    if event.modifiers == KeyModifiers::SHIFT {
                        if let Some(action) =
                            self.controller.action_for(event.code, KeyModifiers::NONE)
                        {
                            self.handle_action(action, now_ms);
                            return;
                        }
                    }
                    if event.modifiers.difference(KeyModifiers::SHIFT).is_empty() {
                        self.press_char(c, now_ms);
                    }
                }
            }
            KeyEventKind::Repeat => {
                if let KeyCode::Char(c) = event.code {
                    self.refresh_char(c, now_ms);
                }
            }
            KeyEventKind::Release => {
                if self.true_release_mode {
                    if let KeyCode::Char(c) = event.code {
                        self.release_char(c, now_ms);
                    }
                }
            }
        }
    }

    /// Dispatch a control action
    pub fn handle_action(&mut self, action: ControlAction, now_ms: u64) {
        match action {
            ControlAction::ToggleRecord => self.toggle_record(now_ms),
            ControlAction::ToggleReplay => self.toggle_replay(now_ms),
            ControlAction::Export => self.export(now_ms),
            ControlAction::ClearRecording => self.clear_recording(now_ms),
            ControlAction::OctaveDown => {
                if self.note_map.octave_down() {
                    let status = format!("Base octave: C{}", self.note_map.base_octave());
                    self.set_status(status, now_ms);
                }
            }
            ControlAction::OctaveUp => {
                if self.note_map.octave_up() {
                    let status = format!("Base octave: C{}", self.note_map.base_octave());
                    self.set_status(status, now_ms);
                }
            }
            ControlAction::ToggleHelp => self.help_visible = !self.help_visible,
            ControlAction::Quit => {
                if self.help_visible {
                    self.help_visible = false;
                } else {
                    self.should_quit = true;
                }
            }
        }
    }

    /// Start recording, or stop and keep the take
    pub fn toggle_record(&mut self, now_ms: u64) {
        if self.recorder.is_recording() {
            self.recorder.stop(now_ms);
            let count = self.recorder.note_count();
            info!("recording stopped: {} notes", count);
            self.set_status(format!("Recording stopped ({} notes)", count), now_ms);
        } else {
            // A new take cancels any replay in progress
            if self.replay.is_active() {
                self.stop_replay(now_ms);
            }
            self.recorder.start(now_ms);
            self.set_status("Recording...".to_string(), now_ms);
        }
    }

    /// Start replaying the recording, or cancel the replay in progress
    pub fn toggle_replay(&mut self, now_ms: u64) {
        if self.replay.is_active() {
            self.stop_replay(now_ms);
            self.set_status("Replay stopped".to_string(), now_ms);
            return;
        }

        if self.recorder.is_recording() {
            self.set_status("Stop recording first".to_string(), now_ms);
            return;
        }

        if self.replay.start(self.recorder.notes(), now_ms) {
            let count = self.recorder.note_count();
            self.set_status(format!("Replaying {} notes", count), now_ms);
        } else {
            self.set_status("Nothing to replay".to_string(), now_ms);
        }
    }

    /// Cancel replay and release everything it was holding
    fn stop_replay(&mut self, now_ms: u64) {
        self.replay.stop();

        let held: Vec<usize> = self
            .pressed
            .iter()
            .filter(|(_, held)| matches!(held.source, PressSource::Replay { .. }))
            .map(|(&key_id, _)| key_id)
            .collect();
        for key_id in held {
            self.release_key(key_id, now_ms);
        }
    }

    /// Export the recording as a MIDI file into the configured directory
    pub fn export(&mut self, now_ms: u64) {
        // Exporting mid-take stops it so held notes are flushed
        if self.recorder.is_recording() {
            self.toggle_record(now_ms);
        }

        if self.recorder.note_count() == 0 {
            warn!("export requested with no recorded notes");
            self.set_status("Nothing to export".to_string(), now_ms);
            return;
        }

        let filename = suggested_filename();
        let path = Path::new(&self.config.export_dir).join(&filename);
        let writer = MidiFileWriter::new();

        match writer.export(&path, self.recorder.notes()) {
            Ok(()) => {
                info!("exported {} notes to {}", self.recorder.note_count(), path.display());
                self.set_status(format!("Saved {}", filename), now_ms);
            }
            Err(e) => {
                warn!("export to {} failed: {}", path.display(), e);
                self.set_status(format!("Export failed: {}", e), now_ms);
            }
        }
    }

    /// Discard the recording
    pub fn clear_recording(&mut self, now_ms: u64) {
        self.recorder.clear();
        self.set_status("Recording cleared".to_string(), now_ms);
    }

    /// Show a transient status message
    pub fn set_status(&mut self, message: String, now_ms: u64) {
        self.status = Some((message, now_ms));
    }

    /// Report whether the terminal delivers real key-release events.
    /// When it does, the sustain timer is disabled.
    pub fn set_true_release_mode(&mut self, enabled: bool) {
        self.true_release_mode = enabled;
    }

    /// Release everything and stop the tone engine, e.g. before exit
    pub fn silence(&mut self, now_ms: u64) {
        self.replay.stop();
        let held: Vec<usize> = self.pressed.keys().copied().collect();
        for key_id in held {
            self.release_key(key_id, now_ms);
        }
        self.audio.all_notes_off();
    }

    // Accessors for rendering

    /// The 88-key table
    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    /// The typing-row note map
    pub fn note_map(&self) -> &NoteMap {
        &self.note_map
    }

    /// Shortcut bindings, for the help overlay
    pub fn controller(&self) -> &KeyboardController {
        &self.controller
    }

    /// In-flight visual notes
    pub fn visual_notes(&self) -> &[VisualNote] {
        self.tracker.notes()
    }

    /// Whether a key is currently held
    pub fn is_key_pressed(&self, key_id: usize) -> bool {
        self.pressed.contains_key(&key_id)
    }

    /// Number of keys currently held
    pub fn pressed_count(&self) -> usize {
        self.pressed.len()
    }

    /// Whether a recording take is in progress
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Whether a replay is in progress
    pub fn is_replaying(&self) -> bool {
        self.replay.is_active()
    }

    /// Number of notes in the recording
    pub fn recorded_count(&self) -> usize {
        self.recorder.note_count()
    }

    /// Recording length so far, in ms
    pub fn recording_elapsed_ms(&self, now_ms: u64) -> u64 {
        self.recorder.elapsed_ms(now_ms)
    }

    /// Replay position as (elapsed, total) in ms
    pub fn replay_progress_ms(&self, now_ms: u64) -> (u64, u64) {
        (self.replay.elapsed_ms(now_ms), self.replay.duration_ms())
    }

    /// Current status message, if one is showing
    pub fn status_message(&self) -> Option<&str> {
        self.status.as_ref().map(|(message, _)| message.as_str())
    }

    /// Whether the help overlay is shown
    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    /// Whether the user asked to quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Name of the connected MIDI port, if any
    pub fn midi_port_name(&self) -> Option<&str> {
        self.midi.port_name()
    }

    /// Whether the audio output is running
    pub fn audio_running(&self) -> bool {
        self.audio.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(PianoConfig::default())
    }

    /// Key id of Middle C (MIDI 60)
    const MIDDLE_C: usize = 39;

    #[test]
    fn test_press_and_release() {
        let mut app = app();

        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        assert!(app.is_key_pressed(MIDDLE_C));
        assert_eq!(app.visual_notes().len(), 1);
        assert!(app.visual_notes()[0].is_growing());

        app.release_key(MIDDLE_C, 400);
        assert!(!app.is_key_pressed(MIDDLE_C));
        assert_eq!(app.visual_notes()[0].duration_ms, Some(400));
    }

    #[test]
    fn test_press_while_held_is_noop() {
        let mut app = app();

        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.press_key(MIDDLE_C, 80, PressSource::Keyboard, 200);

        assert_eq!(app.visual_notes().len(), 1);
        assert_eq!(app.pressed_count(), 1);
    }

    #[test]
    fn test_press_char_maps_rows() {
        let mut app = app();

        // Lower row starts at C4, upper row at C5
        assert!(app.press_char('z', 0));
        assert!(app.is_key_pressed(MIDDLE_C));

        assert!(app.press_char('q', 0));
        let c5 = app.keyboard().key_for_midi(72).unwrap().id;
        assert!(app.is_key_pressed(c5));
    }

    #[test]
    fn test_unmapped_char_ignored() {
        let mut app = app();
        assert!(!app.press_char('a', 0));
        assert!(!app.press_char('1', 0));
        assert_eq!(app.pressed_count(), 0);
    }

    #[test]
    fn test_sustain_timer_releases_typed_keys() {
        let mut app = app();
        let sustain = app.config.key_sustain_ms;

        app.press_char('z', 0);
        app.tick(sustain - 1);
        assert!(app.is_key_pressed(MIDDLE_C));

        app.tick(sustain);
        assert!(!app.is_key_pressed(MIDDLE_C));
    }

    #[test]
    fn test_key_repeat_extends_sustain() {
        let mut app = app();
        let sustain = app.config.key_sustain_ms;

        app.press_char('z', 0);
        app.refresh_char('z', 200);

        app.tick(sustain);
        assert!(app.is_key_pressed(MIDDLE_C));

        app.tick(200 + sustain);
        assert!(!app.is_key_pressed(MIDDLE_C));
    }

    #[test]
    fn test_true_release_mode_disables_sustain() {
        let mut app = app();
        app.set_true_release_mode(true);

        app.press_char('z', 0);
        app.tick(10_000);
        assert!(app.is_key_pressed(MIDDLE_C));

        app.release_char('z', 10_500);
        assert!(!app.is_key_pressed(MIDDLE_C));
    }

    #[test]
    fn test_sustain_ignores_midi_presses() {
        let mut app = app();

        app.press_key(MIDDLE_C, 100, PressSource::Midi, 0);
        app.tick(60_000);
        assert!(app.is_key_pressed(MIDDLE_C));
    }

    #[test]
    fn test_record_captures_presses() {
        let mut app = app();

        app.toggle_record(1000);
        assert!(app.is_recording());

        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 1000);
        app.release_key(MIDDLE_C, 1400);
        app.toggle_record(2000);

        assert!(!app.is_recording());
        assert_eq!(app.recorded_count(), 1);
    }

    #[test]
    fn test_replay_roundtrip() {
        let mut app = app();
        app.set_true_release_mode(true);

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 300);
        app.press_key(41, 90, PressSource::Keyboard, 500);
        app.release_key(41, 800);
        app.toggle_record(900);

        app.toggle_replay(10_000);
        assert!(app.is_replaying());

        // First press fires at its original offset from replay start
        app.tick(10_000);
        assert!(app.is_key_pressed(MIDDLE_C));
        assert!(!app.is_key_pressed(41));

        app.tick(10_300);
        assert!(!app.is_key_pressed(MIDDLE_C));

        app.tick(10_500);
        assert!(app.is_key_pressed(41));

        app.tick(10_800);
        assert!(!app.is_key_pressed(41));

        // Idle after the last release plus the end buffer
        app.tick(11_050);
        assert!(!app.is_replaying());

        // Replay did not consume the recording
        assert_eq!(app.recorded_count(), 2);
    }

    #[test]
    fn test_replay_notes_carry_replay_color() {
        let mut app = app();

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 300);
        app.toggle_record(400);

        app.toggle_replay(10_000);
        app.tick(10_000);

        let replayed = app.visual_notes().last().unwrap();
        assert_eq!(replayed.color, NoteColor::Replay);
        // Held time known up front; the bar never grows
        assert!(!replayed.is_growing());
        assert_eq!(replayed.duration_ms, Some(300));
    }

    #[test]
    fn test_replay_rejected_while_recording() {
        let mut app = app();

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 300);

        app.toggle_replay(400);
        assert!(!app.is_replaying());
        assert_eq!(app.status_message(), Some("Stop recording first"));
    }

    #[test]
    fn test_replay_with_empty_recording() {
        let mut app = app();
        app.toggle_replay(0);
        assert!(!app.is_replaying());
        assert_eq!(app.status_message(), Some("Nothing to replay"));
    }

    #[test]
    fn test_new_take_cancels_replay() {
        let mut app = app();

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 300);
        app.toggle_record(400);

        app.toggle_replay(1000);
        app.tick(1000);
        assert!(app.is_key_pressed(MIDDLE_C));

        app.toggle_record(1100);
        assert!(app.is_recording());
        assert!(!app.is_replaying());
        // The replay's held key was released on cancel
        assert!(!app.is_key_pressed(MIDDLE_C));
    }

    #[test]
    fn test_toggle_replay_cancels() {
        let mut app = app();

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 500);
        app.toggle_record(600);

        app.toggle_replay(1000);
        app.tick(1000);
        app.toggle_replay(1100);

        assert!(!app.is_replaying());
        assert!(!app.is_key_pressed(MIDDLE_C));
        // Nothing fires after the cancel
        app.tick(5000);
        assert_eq!(app.pressed_count(), 0);
    }

    #[test]
    fn test_export_empty_rejected() {
        let mut app = app();
        app.export(0);
        assert_eq!(app.status_message(), Some("Nothing to export"));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PianoConfig::default();
        config.export_dir = dir.path().to_string_lossy().into_owned();
        let mut app = App::new(config);

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 500);
        app.toggle_record(600);

        app.export(700);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().to_string_lossy().into_owned();
        assert!(name.starts_with("piano-recording-"));
        assert!(name.ends_with(".mid"));
        assert!(app.status_message().unwrap().starts_with("Saved "));
    }

    #[test]
    fn test_export_mid_take_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PianoConfig::default();
        config.export_dir = dir.path().to_string_lossy().into_owned();
        let mut app = App::new(config);

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        // Still held at export time
        app.export(400);

        assert!(!app.is_recording());
        assert_eq!(app.recorded_count(), 1);
        assert_eq!(app.recorder.notes()[0].duration_ms, 400);
    }

    #[test]
    fn test_clear_recording() {
        let mut app = app();

        app.toggle_record(0);
        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 300);
        app.toggle_record(400);
        assert_eq!(app.recorded_count(), 1);

        app.clear_recording(500);
        assert_eq!(app.recorded_count(), 0);
        assert_eq!(app.status_message(), Some("Recording cleared"));
    }

    #[test]
    fn test_swept_after_animation_budget() {
        let mut app = app();

        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.release_key(MIDDLE_C, 100);

        // Budget is duration + removal allowance, from spawn
        app.tick(3600 - SWEEP_INTERVAL_MS);
        assert_eq!(app.visual_notes().len(), 1);

        app.tick(3601);
        assert_eq!(app.visual_notes().len(), 0);
    }

    #[test]
    fn test_status_expires() {
        let mut app = app();

        app.set_status("hello".to_string(), 0);
        app.tick(STATUS_TTL_MS - 1);
        assert_eq!(app.status_message(), Some("hello"));

        app.tick(STATUS_TTL_MS);
        assert_eq!(app.status_message(), None);
    }

    #[test]
    fn test_octave_shift_updates_map() {
        let mut app = app();

        app.handle_action(ControlAction::OctaveUp, 0);
        assert_eq!(app.note_map().base_octave(), 5);
        assert_eq!(app.note_map().note_for('z'), Some(72));

        app.handle_action(ControlAction::OctaveDown, 100);
        app.handle_action(ControlAction::OctaveDown, 200);
        assert_eq!(app.note_map().base_octave(), 3);
    }

    #[test]
    fn test_quit_action() {
        let mut app = app();
        assert!(!app.should_quit());
        app.handle_action(ControlAction::Quit, 0);
        assert!(app.should_quit());
    }

    #[test]
    fn test_esc_closes_help_before_quitting() {
        let mut app = app();

        app.handle_action(ControlAction::ToggleHelp, 0);
        assert!(app.help_visible());

        app.handle_action(ControlAction::Quit, 100);
        assert!(!app.help_visible());
        assert!(!app.should_quit());

        app.handle_action(ControlAction::Quit, 200);
        assert!(app.should_quit());
    }

    #[test]
    fn test_key_events_route_to_notes_and_shortcuts() {
        let mut app = app();

        let z = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
        app.handle_key_event(z, 0);
        assert!(app.is_key_pressed(MIDDLE_C));

        let f2 = KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE);
        app.handle_key_event(f2, 100);
        assert!(app.is_recording());
    }

    #[test]
    fn test_shifted_question_mark_opens_help() {
        let mut app = app();

        let help = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        app.handle_key_event(help, 0);
        assert!(app.help_visible());
        assert_eq!(app.pressed_count(), 0);
    }

    #[test]
    fn test_silence_releases_everything() {
        let mut app = app();

        app.press_key(MIDDLE_C, 100, PressSource::Keyboard, 0);
        app.press_key(50, 100, PressSource::Midi, 0);
        app.silence(100);

        assert_eq!(app.pressed_count(), 0);
    }
}
