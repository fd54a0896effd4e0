// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard shortcut handling.
//!
//! Provides the shortcut bindings for transport, export, octave and UI
//! actions. Note-playing keys are handled separately by [`super::NoteMap`].
//! The table is small and fixed, so bindings live in a Vec in the order
//! the help overlay lists them.

use std::fmt;

use crossterm::event::{KeyCode, KeyModifiers};

use super::ControlAction;

/// Binding groups, in help overlay order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingCategory {
    Transport,
    File,
    Octave,
    Ui,
}

impl BindingCategory {
    /// All categories in display order
    pub const ALL: [BindingCategory; 4] = [
        BindingCategory::Transport,
        BindingCategory::File,
        BindingCategory::Octave,
        BindingCategory::Ui,
    ];

    /// Heading shown in the help overlay
    pub fn label(self) -> &'static str {
        match self {
            BindingCategory::Transport => "Transport",
            BindingCategory::File => "File",
            BindingCategory::Octave => "Octave",
            BindingCategory::Ui => "UI",
        }
    }
}

/// A key chord that triggers an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    /// The main key
    pub code: KeyCode,
    /// Modifiers that must be held
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    /// Chord from a key code and modifier set
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Chord with no modifiers
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Chord with Ctrl held
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }

    /// Check if this shortcut matches a key event
    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.code == code && self.modifiers == modifiers
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            write!(f, "Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            write!(f, "Shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char(c) => write!(f, "{}", c.to_uppercase()),
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Up => write!(f, "↑"),
            KeyCode::Down => write!(f, "↓"),
            KeyCode::Left => write!(f, "←"),
            KeyCode::Right => write!(f, "→"),
            KeyCode::Enter => write!(f, "Enter"),
            KeyCode::Esc => write!(f, "Esc"),
            _ => write!(f, "?"),
        }
    }
}

/// A shortcut bound to an action, with its help text
#[derive(Debug, Clone, Copy)]
pub struct KeyBinding {
    /// The shortcut
    pub shortcut: Shortcut,
    /// The action to perform
    pub action: ControlAction,
    /// Help text
    pub description: &'static str,
    /// Help group
    pub category: BindingCategory,
}

/// Fixed shortcut table mapping key chords to actions
pub struct KeyboardController {
    bindings: Vec<KeyBinding>,
}

impl KeyboardController {
    /// Create an empty controller
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Create a controller with the standard bindings
    pub fn with_defaults() -> Self {
        use BindingCategory::{File, Octave, Transport, Ui};
        use ControlAction::{
            ClearRecording, Export, OctaveDown, OctaveUp, Quit, ToggleHelp, ToggleRecord,
            ToggleReplay,
        };

        let table = [
            (Shortcut::key(KeyCode::F(2)), ToggleRecord, "Start/Stop Recording", Transport),
            (Shortcut::key(KeyCode::F(3)), ToggleReplay, "Replay Recording", Transport),
            (Shortcut::key(KeyCode::F(4)), Export, "Export MIDI File", File),
            (Shortcut::key(KeyCode::F(5)), ClearRecording, "Clear Recording", File),
            (Shortcut::key(KeyCode::Left), OctaveDown, "Octave Down", Octave),
            (Shortcut::key(KeyCode::Right), OctaveUp, "Octave Up", Octave),
            (Shortcut::key(KeyCode::F(1)), ToggleHelp, "Toggle Help", Ui),
            (Shortcut::key(KeyCode::Char('?')), ToggleHelp, "Toggle Help", Ui),
            (Shortcut::key(KeyCode::Esc), Quit, "Quit", Ui),
            (Shortcut::ctrl(KeyCode::Char('c')), Quit, "Quit", Ui),
        ];

        let mut controller = Self::new();
        for (shortcut, action, description, category) in table {
            controller.bind(shortcut, action, description, category);
        }
        controller
    }

    /// Bind a chord to an action, replacing any previous binding for it
    pub fn bind(
        &mut self,
        shortcut: Shortcut,
        action: ControlAction,
        description: &'static str,
        category: BindingCategory,
    ) {
        self.bindings.retain(|b| b.shortcut != shortcut);
        self.bindings.push(KeyBinding {
            shortcut,
            action,
            description,
            category,
        });
    }

    /// Look up the action for a key event
    pub fn action_for(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        self.bindings
            .iter()
            .find(|b| b.shortcut.matches(code, modifiers))
            .map(|b| b.action)
    }

    /// All bindings in declaration order
    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter()
    }

    /// Bindings for one help category, in declaration order
    pub fn bindings_in(&self, category: BindingCategory) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter().filter(move |b| b.category == category)
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::with_defaults()
    }
}
