// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input handling for external keyboards and controllers.
//!
//! Connects to a midir input port and forwards parsed messages over a
//! channel. The connection callback runs on midir's thread; the app
//! drains the channel from its event loop.

use std::sync::mpsc::{channel, Receiver, TryRecvError};

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use tracing::{info, warn};

use super::MidiMessage;

/// MIDI input handler for receiving messages
pub struct MidiInputHandler {
    connection: Option<MidiInputConnection<()>>,
    receiver: Option<Receiver<MidiMessage>>,
    port_name: Option<String>,
}

impl MidiInputHandler {
    /// Create a disconnected handler
    pub fn new() -> Self {
        Self {
            connection: None,
            receiver: None,
            port_name: None,
        }
    }

    /// Connect to the first input port whose name contains `name`
    pub fn connect(&mut self, name: &str) -> Result<()> {
        let midi_in = new_client()?;
        let ports = midi_in.ports();

        let port = ports
            .iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .map(|n| n.contains(name))
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| anyhow!("MIDI input '{}' not found", name))?;

        self.connect_to_port(midi_in, port)
    }

    /// Connect to an input port by index (as listed by `list_ports`)
    pub fn connect_by_index(&mut self, index: usize) -> Result<()> {
        let midi_in = new_client()?;
        let ports = midi_in.ports();

        let port = ports
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("MIDI input {} not found", index))?;

        self.connect_to_port(midi_in, port)
    }

    fn connect_to_port(&mut self, mut midi_in: MidiInput, port: MidiInputPort) -> Result<()> {
        let name = midi_in
            .port_name(&port)
            .unwrap_or_else(|_| "unknown".to_string());

        let (sender, receiver) = channel::<MidiMessage>();

        // Sysex and timing traffic is noise for a piano
        midi_in.ignore(Ignore::Sysex | Ignore::Time);

        let connection = midi_in
            .connect(
                &port,
                "ivory-input",
                move |_timestamp, bytes, _| {
                    if let Some(msg) = MidiMessage::parse(bytes) {
                        let _ = sender.send(msg);
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", name, e))?;

        info!("Connected to MIDI input '{}'", name);

        self.connection = Some(connection);
        self.receiver = Some(receiver);
        self.port_name = Some(name);

        Ok(())
    }

    /// Whether a port is connected
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Name of the connected port, if any
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Try to receive the next MIDI message (non-blocking)
    pub fn try_recv(&self) -> Option<MidiMessage> {
        self.receiver.as_ref()?.try_recv().ok()
    }

    /// Receive all pending MIDI messages (non-blocking)
    pub fn recv_all(&self) -> Vec<MidiMessage> {
        let mut messages = Vec::new();
        if let Some(receiver) = &self.receiver {
            loop {
                match receiver.try_recv() {
                    Ok(msg) => messages.push(msg),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        messages
    }

    /// Drop the current connection
    pub fn disconnect(&mut self) {
        if let Some(name) = self.port_name.take() {
            warn!("Disconnecting MIDI input '{}'", name);
        }
        self.connection = None;
        self.receiver = None;
    }
}

impl Default for MidiInputHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn new_client() -> Result<MidiInput> {
    MidiInput::new("Ivory").map_err(|e| anyhow!("Failed to create MIDI client: {}", e))
}

/// List all available MIDI input ports
pub fn list_ports() -> Result<Vec<(usize, String)>> {
    let midi_in = new_client()?;

    let ports = midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(i, port)| midi_in.port_name(port).ok().map(|name| (i, name)))
        .collect();

    Ok(ports)
}

/// Print all available MIDI input ports to stdout
pub fn print_ports() -> Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No MIDI input ports found.");
    } else {
        println!("Available MIDI input ports:");
        for (i, name) in ports {
            println!("  {}: {}", i, name);
        }
    }
    Ok(())
}
