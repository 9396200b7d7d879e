//! USB HID keyboard usage codes and the US-layout character table.
//!
//! Usage IDs follow the HID Usage Tables, page 0x07 (Keyboard/Keypad).
//! Modifier bits follow the boot-protocol report's first byte.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// A keyboard usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u8);

/// Modifier bitfield held down while a key is pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0x00);
    pub const LEFT_CTRL: Modifiers = Modifiers(0x01);
    pub const LEFT_SHIFT: Modifiers = Modifiers(0x02);
    pub const LEFT_ALT: Modifiers = Modifiers(0x04);
    pub const LEFT_GUI: Modifiers = Modifiers(0x08);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl KeyCode {
    pub const A: KeyCode = KeyCode(0x04);
    pub const D: KeyCode = KeyCode(0x07);
    pub const M: KeyCode = KeyCode(0x10);
    pub const R: KeyCode = KeyCode(0x15);
    pub const Z: KeyCode = KeyCode(0x1D);
    pub const NUM_1: KeyCode = KeyCode(0x1E);
    pub const NUM_0: KeyCode = KeyCode(0x27);
    pub const ENTER: KeyCode = KeyCode(0x28);
    pub const ESCAPE: KeyCode = KeyCode(0x29);
    pub const BACKSPACE: KeyCode = KeyCode(0x2A);
    pub const TAB: KeyCode = KeyCode(0x2B);
    pub const SPACE: KeyCode = KeyCode(0x2C);
    pub const MINUS: KeyCode = KeyCode(0x2D);
    pub const EQUAL: KeyCode = KeyCode(0x2E);
    pub const LEFT_BRACE: KeyCode = KeyCode(0x2F);
    pub const RIGHT_BRACE: KeyCode = KeyCode(0x30);
    pub const BACKSLASH: KeyCode = KeyCode(0x31);
    pub const SEMICOLON: KeyCode = KeyCode(0x33);
    pub const QUOTE: KeyCode = KeyCode(0x34);
    pub const TILDE: KeyCode = KeyCode(0x35);
    pub const COMMA: KeyCode = KeyCode(0x36);
    pub const PERIOD: KeyCode = KeyCode(0x37);
    pub const SLASH: KeyCode = KeyCode(0x38);
    pub const CAPS_LOCK: KeyCode = KeyCode(0x39);
    pub const PAGE_UP: KeyCode = KeyCode(0x4B);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x4E);
    pub const RIGHT: KeyCode = KeyCode(0x4F);
    pub const LEFT: KeyCode = KeyCode(0x50);
    pub const DOWN: KeyCode = KeyCode(0x51);
    pub const UP: KeyCode = KeyCode(0x52);

    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            KeyCode::ENTER => "Enter",
            KeyCode::ESCAPE => "Escape",
            KeyCode::BACKSPACE => "Backspace",
            KeyCode::TAB => "Tab",
            KeyCode::SPACE => "Space",
            KeyCode::CAPS_LOCK => "CapsLock",
            KeyCode::PAGE_UP => "PageUp",
            KeyCode::PAGE_DOWN => "PageDown",
            KeyCode::RIGHT => "Right",
            KeyCode::LEFT => "Left",
            KeyCode::DOWN => "Down",
            KeyCode::UP => "Up",
            KeyCode(code) if (KeyCode::A.0..=KeyCode::Z.0).contains(&code) => {
                LETTER_NAMES[(code - KeyCode::A.0) as usize]
            }
            _ => "Key",
        }
    }
}

const LETTER_NAMES: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), self.0)
    }
}

// Punctuation keys: (unshifted, shifted, key)
const PUNCTUATION: [(char, char, KeyCode); 11] = [
    ('-', '_', KeyCode::MINUS),
    ('=', '+', KeyCode::EQUAL),
    ('[', '{', KeyCode::LEFT_BRACE),
    (']', '}', KeyCode::RIGHT_BRACE),
    ('\\', '|', KeyCode::BACKSLASH),
    (';', ':', KeyCode::SEMICOLON),
    ('\'', '"', KeyCode::QUOTE),
    ('`', '~', KeyCode::TILDE),
    (',', '<', KeyCode::COMMA),
    ('.', '>', KeyCode::PERIOD),
    ('/', '?', KeyCode::SLASH),
];

// Shifted digit row, index 0 is the '1' key
const SHIFTED_DIGITS: [char; 10] = ['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'];

/// Key chord producing `ch` on a US layout, if there is one.
pub fn ascii_chord(ch: char) -> Option<(KeyCode, Modifiers)> {
    match ch {
        'a'..='z' => Some((KeyCode(KeyCode::A.0 + (ch as u8 - b'a')), Modifiers::NONE)),
        'A'..='Z' => Some((KeyCode(KeyCode::A.0 + (ch as u8 - b'A')), Modifiers::LEFT_SHIFT)),
        '1'..='9' => Some((KeyCode(KeyCode::NUM_1.0 + (ch as u8 - b'1')), Modifiers::NONE)),
        '0' => Some((KeyCode::NUM_0, Modifiers::NONE)),
        ' ' => Some((KeyCode::SPACE, Modifiers::NONE)),
        '\n' => Some((KeyCode::ENTER, Modifiers::NONE)),
        '\t' => Some((KeyCode::TAB, Modifiers::NONE)),
        _ => {
            if let Some(idx) = SHIFTED_DIGITS.iter().position(|&c| c == ch) {
                return Some((KeyCode(KeyCode::NUM_1.0 + idx as u8), Modifiers::LEFT_SHIFT));
            }
            PUNCTUATION.iter().find_map(|&(plain, shifted, key)| {
                if ch == plain {
                    Some((key, Modifiers::NONE))
                } else if ch == shifted {
                    Some((key, Modifiers::LEFT_SHIFT))
                } else {
                    None
                }
            })
        }
    }
}

/// Character a chord types on a US layout. Chords holding anything other
/// than shift produce no character.
pub fn chord_char(key: KeyCode, modifiers: Modifiers) -> Option<char> {
    let shift = match modifiers {
        Modifiers::NONE => false,
        Modifiers::LEFT_SHIFT => true,
        _ => return None,
    };
    let code = key.0;
    match key {
        _ if (KeyCode::A.0..=KeyCode::Z.0).contains(&code) => {
            let base = if shift { b'A' } else { b'a' };
            Some((base + (code - KeyCode::A.0)) as char)
        }
        _ if (KeyCode::NUM_1.0..KeyCode::NUM_0.0).contains(&code) => {
            let idx = (code - KeyCode::NUM_1.0) as usize;
            Some(if shift { SHIFTED_DIGITS[idx] } else { (b'1' + idx as u8) as char })
        }
        KeyCode::NUM_0 => Some(if shift { ')' } else { '0' }),
        KeyCode::SPACE if !shift => Some(' '),
        KeyCode::ENTER if !shift => Some('\n'),
        KeyCode::TAB if !shift => Some('\t'),
        _ => PUNCTUATION
            .iter()
            .find(|&&(_, _, k)| k == key)
            .map(|&(plain, shifted, _)| if shift { shifted } else { plain }),
    }
}
