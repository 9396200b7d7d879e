//! Simulated USB keyboard that records every keystroke.

use hidprank_shared::keycodes::chord_char;
use hidprank_shared::{KeyCode, Keyboard, Modifiers};
use serde::Serialize;
use std::cell::Cell;
use std::io::Write;

/// One key press as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub seq: u64,
    pub key: KeyCode,
    pub modifiers: Modifiers,
    /// Character the chord types on a US layout, if any.
    pub ch: Option<char>,
}

/// Keyboard that enumerates after a configurable number of readiness polls
/// and keeps a log of everything it typed.
pub struct RecordingKeyboard {
    events: Vec<KeyEvent>,
    initialized: bool,
    polls_until_configured: Cell<u32>,
    polls: Cell<u32>,
    transcript: Option<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for RecordingKeyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingKeyboard")
            .field("events", &self.events.len())
            .field("initialized", &self.initialized)
            .field("polls", &self.polls.get())
            .finish()
    }
}

impl Default for RecordingKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingKeyboard {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            initialized: false,
            polls_until_configured: Cell::new(0),
            polls: Cell::new(0),
            transcript: None,
        }
    }

    /// Host finishes enumeration only after `polls` readiness checks.
    pub fn with_enumeration_delay(mut self, polls: u32) -> Self {
        self.polls_until_configured = Cell::new(polls);
        self
    }

    /// Also write each key event as a JSON line to `sink`.
    pub fn with_transcript(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.transcript = Some(sink);
        self
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    /// Number of `is_configured` calls made so far.
    pub fn readiness_polls(&self) -> u32 {
        self.polls.get()
    }

    /// Everything the host would have received as text.
    pub fn typed_text(&self) -> String {
        self.events.iter().filter_map(|e| e.ch).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn record(&mut self, event: KeyEvent) {
        if let Some(sink) = self.transcript.as_mut() {
            let written = serde_json::to_string(&event)
                .map_err(std::io::Error::from)
                .and_then(|line| writeln!(sink, "{}", line));
            if let Err(e) = written {
                tracing::warn!("Failed to write keystroke transcript: {}", e);
            }
        }
        self.events.push(event);
    }
}

impl Keyboard for RecordingKeyboard {
    fn init(&mut self) {
        tracing::debug!("USB keyboard initialized");
        self.initialized = true;
    }

    fn is_configured(&self) -> bool {
        self.polls.set(self.polls.get() + 1);
        if !self.initialized {
            return false;
        }
        let remaining = self.polls_until_configured.get();
        if remaining == 0 {
            return true;
        }
        self.polls_until_configured.set(remaining - 1);
        false
    }

    fn press(&mut self, key: KeyCode, modifiers: Modifiers) {
        let event = KeyEvent {
            seq: self.events.len() as u64,
            key,
            modifiers,
            ch: chord_char(key, modifiers),
        };
        tracing::debug!("HID press {} mods=0x{:02X}", key, modifiers.0);
        self.record(event);
    }
}
