// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::event::Event;
use tracing::{info, warn, Level};

use ivory::app::App;
use ivory::config::PianoConfig;
use ivory::midi;
use ivory::ui::Tui;

/// Config file looked for when --config is not given
const DEFAULT_CONFIG_PATH: &str = "ivory.yaml";

/// Log file written next to the binary's working directory
const LOG_PATH: &str = "ivory.log";

fn print_usage() {
    println!("Ivory - Terminal Piano");
    println!();
    println!("Usage: ivory [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-midi         List available MIDI input ports");
    println!("  --midi-port <PORT>  Connect to MIDI input PORT (index or name substring)");
    println!("  --config <PATH>     Load configuration from PATH");
    println!("  --export-dir <DIR>  Write exported MIDI files to DIR");
    println!("  --no-audio          Run without audio output");
    println!("  --help              Show this help message");
    println!();
    println!("Keys:");
    println!("  z-m row             Lower octave (C4-B4, sharps on s d g h j)");
    println!("  q-i row             Upper octave (C5-C6, sharps on 2 3 5 6 7)");
    println!("  F2/F3/F4/F5         Record / Replay / Export / Clear");
    println!("  Left/Right          Shift base octave");
    println!("  F1                  Help overlay");
    println!("  Esc or Ctrl+C       Quit");
}

/// Command-line overrides applied on top of the config file
#[derive(Default)]
struct CliArgs {
    config_path: Option<String>,
    midi_port: Option<String>,
    export_dir: Option<String>,
    no_audio: bool,
}

fn require_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            eprintln!("Run with --help for usage information");
            std::process::exit(1);
        }
    }
}

/// Route tracing output to the log file; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let log_file = File::create(LOG_PATH)
        .with_context(|| format!("Failed to create log file {}", LOG_PATH))?;

    tracing_subscriber::fmt()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .init();

    Ok(())
}

fn load_config(cli: &CliArgs) -> Result<PianoConfig> {
    let mut config = match &cli.config_path {
        Some(path) => {
            PianoConfig::load(path).with_context(|| format!("Failed to load config {}", path))?
        }
        None => PianoConfig::load_or_default(DEFAULT_CONFIG_PATH)?,
    };

    if cli.midi_port.is_some() {
        config.midi_port = cli.midi_port.clone();
    }
    if let Some(dir) = &cli.export_dir {
        config.export_dir = dir.clone();
    }
    if cli.no_audio {
        config.audio.enabled = false;
    }

    for adjustment in config.validate() {
        warn!("config adjusted: {}", adjustment);
    }

    Ok(config)
}

fn run(config: PianoConfig) -> Result<()> {
    let mut app = App::new(config);

    let mut tui = Tui::new().context("Failed to set up terminal")?;
    let true_release = tui.enable_key_release_events().unwrap_or(false);
    app.set_true_release_mode(true_release);
    info!(
        "terminal ready, key release events {}",
        if true_release { "on" } else { "off" }
    );

    app.start_devices();

    while !app.should_quit() {
        if let Some(event) = tui.poll_event()? {
            let now = app.now_ms();
            match event {
                Event::Key(key) => app.handle_key_event(key, now),
                // Redrawn every frame anyway
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        let now = app.now_ms();
        app.tick(now);
        tui.draw(&app, now)?;
    }

    app.silence(app.now_ms());
    info!("ivory exiting");
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--list-midi" => {
                return midi::input::print_ports();
            }
            "--midi-port" => {
                cli.midi_port = Some(require_value(&args, i, "--midi-port").to_string());
                i += 1;
            }
            "--config" => {
                cli.config_path = Some(require_value(&args, i, "--config").to_string());
                i += 1;
            }
            "--export-dir" => {
                cli.export_dir = Some(require_value(&args, i, "--export-dir").to_string());
                i += 1;
            }
            "--no-audio" => {
                cli.no_audio = true;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    init_logging()?;
    info!("ivory starting");

    let config = load_config(&cli)?;
    run(config)
}
