// hidprank_shared: hardware seams shared by the firmware core and the simulator

pub mod keycodes;

pub use keycodes::{KeyCode, Modifiers};

use std::sync::Arc;

/// Handler invoked by a [`HardwareTimer`] once per tick.
pub type TickHandler = Arc<dyn Fn() + Send + Sync>;

// --- Keyboard emulation ---

/// USB keyboard emulation as seen by the firmware.
///
/// Every call is fire-and-forget: the firmware never inspects the outcome
/// of a keystroke and never retries one.
pub trait Keyboard {
    /// Bring up the USB subsystem.
    fn init(&mut self);

    /// True once the host has enumerated and configured the device.
    fn is_configured(&self) -> bool;

    /// Press and release a single key with the given modifiers held.
    fn press(&mut self, key: KeyCode, modifiers: Modifiers);

    /// Type a string as a sequence of key presses (US layout).
    ///
    /// Characters with no key on the layout are skipped.
    fn type_str(&mut self, text: &str) {
        for ch in text.chars() {
            if let Some((key, modifiers)) = keycodes::ascii_chord(ch) {
                self.press(key, modifiers);
            }
        }
    }
}

// --- Status indicator ---

/// The visible status LED.
///
/// Toggled from the tick handler as well as from the foreground, so all
/// operations take `&self`.
pub trait StatusLed: Send + Sync {
    fn init(&self);
    fn toggle(&self);
    fn is_on(&self) -> bool;
}

// --- Nonvolatile storage ---

/// Byte-addressed nonvolatile storage accessed in little-endian 16-bit words.
///
/// Writes have no failure mode at this seam. Backends that can fail log the
/// failure and carry on.
pub trait Eeprom {
    fn read_word(&self, addr: u16) -> u16;
    fn write_word(&mut self, addr: u16, value: u16);
}

// --- Timer and delays ---

/// A periodic hardware timer driving a registered tick handler.
pub trait HardwareTimer {
    /// Configure the timer for `tick_hz` interrupts per second and enable it.
    fn start(&mut self, tick_hz: u32, handler: TickHandler);

    /// Run `f` with the tick interrupt masked, restoring the previous mask
    /// state afterwards. No tick handler runs while `f` executes.
    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// Blocking busy-wait delay on the foreground.
pub trait DelayMs {
    fn delay_ms(&mut self, ms: u32);
}
