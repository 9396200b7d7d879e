//! # Escalation Policy Variants
//!
//! Both shipped firmware variants are instances of [`PolicyConfig`]; they
//! differ only in thresholds, pools and weights.
//!
//! ## Example: TOML override for the simulator
//!
//! ```toml
//! [policy]
//! variant = "patient"
//!
//! # or a complete inline table:
//! [policy.custom]
//! name = "bench"
//! warning_min_boots = 2
//! warning_cap_boots = 4
//! chaotic_above_boots = 4
//! chaotic_on_uptime = true
//! ...
//! ```

use crate::config::ConfigError;
use crate::policy::Action;
use hidprank_shared::{KeyCode, Modifiers};
use serde::{Deserialize, Serialize};

pub const ROLL_URL: &str = "http://goo.gl/EqyxaA";
pub const TAUNT_STRING: &str = "Magnus is the champion of the world!";

/// A key pressed together with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: KeyCode,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub const fn plain(key: KeyCode) -> Self {
        Self { key, modifiers: Modifiers::NONE }
    }

    pub const fn with(modifiers: Modifiers, key: KeyCode) -> Self {
        Self { key, modifiers }
    }
}

/// One row of the chaotic tier's weighted table.
///
/// The delay after the action is `delay_floor_secs + random_below(delay_span_secs)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaoticEntry {
    pub action: Action,
    pub weight: u32,
    #[serde(default)]
    pub delay_floor_secs: u32,
    pub delay_span_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RickrollConfig {
    /// Shortcut opening the run/search prompt.
    pub shortcut: KeyChord,
    /// Pause between the shortcut and typing, for the prompt to appear.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TauntConfig {
    #[serde(default)]
    pub shortcut: Option<KeyChord>,
    pub text: String,
}

/// Thresholds, weight tables and delay formulas for the escalation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub name: String,
    /// Warning tier applies from this many boots.
    pub warning_min_boots: u16,
    /// Boot count at which the warning delay span reaches zero.
    pub warning_cap_boots: u16,
    /// Chaotic tier applies once the boot count exceeds this.
    pub chaotic_above_boots: u16,
    /// Whether reaching the crazy uptime alone also triggers the chaotic tier.
    pub chaotic_on_uptime: bool,
    /// Added to every warning and escalated delay.
    #[serde(default = "default_delay_floor_secs")]
    pub delay_floor_secs: u32,
    /// Warning span per boot left below the cap.
    #[serde(default = "default_warning_step_secs")]
    pub warning_step_secs: u32,
    /// Escalated span at the start of the ramp; shrinks linearly to zero.
    #[serde(default = "default_escalated_ramp_secs")]
    pub escalated_ramp_secs: u32,
    pub chaotic: Vec<ChaoticEntry>,
    /// Benign keys, drawn uniformly. Repeat an entry to weight it.
    pub benign_keys: Vec<KeyChord>,
    pub rickroll: RickrollConfig,
    pub taunt: TauntConfig,
    #[serde(default = "default_blink_toggles")]
    pub blink_toggles: u32,
    #[serde(default = "default_blink_interval_ms")]
    pub blink_interval_ms: u32,
}

fn default_settle_ms() -> u32 { 500 }
fn default_delay_floor_secs() -> u32 { 60 }
fn default_warning_step_secs() -> u32 { 60 }
fn default_escalated_ramp_secs() -> u32 { 300 }
fn default_blink_toggles() -> u32 { 10 }
fn default_blink_interval_ms() -> u32 { 100 }

fn navigation_keys() -> Vec<KeyChord> {
    vec![
        KeyChord::plain(KeyCode::CAPS_LOCK),
        KeyChord::plain(KeyCode::CAPS_LOCK),
        KeyChord::plain(KeyCode::PAGE_UP),
        KeyChord::plain(KeyCode::PAGE_UP),
        KeyChord::plain(KeyCode::PAGE_DOWN),
        KeyChord::plain(KeyCode::PAGE_DOWN),
        KeyChord::plain(KeyCode::DOWN),
        KeyChord::plain(KeyCode::LEFT),
        KeyChord::plain(KeyCode::UP),
        KeyChord::plain(KeyCode::RIGHT),
    ]
}

fn chaotic_table(benign: u32, rickroll: u32, taunt: u32) -> Vec<ChaoticEntry> {
    vec![
        ChaoticEntry { action: Action::BenignKey, weight: benign, delay_floor_secs: 0, delay_span_secs: 120 },
        ChaoticEntry { action: Action::Rickroll, weight: rickroll, delay_floor_secs: 60, delay_span_secs: 180 },
        ChaoticEntry { action: Action::Taunt, weight: taunt, delay_floor_secs: 0, delay_span_secs: 120 },
    ]
}

impl PolicyConfig {
    /// Warning from 5 boots, chaotic past 10 boots or at crazy uptime.
    pub fn classic() -> Self {
        let mut benign_keys = navigation_keys();
        benign_keys.push(KeyChord::with(Modifiers::LEFT_GUI, KeyCode::M));
        Self {
            name: "classic".to_string(),
            warning_min_boots: 5,
            warning_cap_boots: 10,
            chaotic_above_boots: 10,
            chaotic_on_uptime: true,
            delay_floor_secs: default_delay_floor_secs(),
            warning_step_secs: default_warning_step_secs(),
            escalated_ramp_secs: default_escalated_ramp_secs(),
            chaotic: chaotic_table(6, 3, 1),
            benign_keys,
            rickroll: RickrollConfig {
                shortcut: KeyChord::with(Modifiers::LEFT_GUI, KeyCode::R),
                settle_ms: default_settle_ms(),
                url: ROLL_URL.to_string(),
            },
            taunt: TauntConfig {
                shortcut: Some(KeyChord::with(Modifiers::LEFT_ALT, KeyCode::D)),
                text: TAUNT_STRING.to_string(),
            },
            blink_toggles: default_blink_toggles(),
            blink_interval_ms: default_blink_interval_ms(),
        }
    }

    /// Warning from 10 boots, chaotic only past 20 boots.
    pub fn patient() -> Self {
        Self {
            name: "patient".to_string(),
            warning_min_boots: 10,
            warning_cap_boots: 20,
            chaotic_above_boots: 20,
            chaotic_on_uptime: false,
            chaotic: chaotic_table(7, 2, 1),
            benign_keys: navigation_keys(),
            taunt: TauntConfig { shortcut: None, text: TAUNT_STRING.to_string() },
            ..Self::classic()
        }
    }

    /// The variant selected by the `patient` cargo feature.
    pub fn shipped() -> Self {
        if cfg!(feature = "patient") {
            Self::patient()
        } else {
            Self::classic()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "classic" => Some(Self::classic()),
            "patient" => Some(Self::patient()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warning_min_boots > self.warning_cap_boots {
            return Err(ConfigError::Invalid(format!(
                "policy '{}': warning_min_boots {} exceeds warning_cap_boots {}",
                self.name, self.warning_min_boots, self.warning_cap_boots
            )));
        }
        match self.chaotic.iter().try_fold(0u32, |acc, e| acc.checked_add(e.weight)) {
            None => {
                return Err(ConfigError::Invalid(format!(
                    "policy '{}': chaotic weights overflow a u32 total",
                    self.name
                )));
            }
            Some(0) => {
                return Err(ConfigError::Invalid(format!(
                    "policy '{}': chaotic weights must not all be zero",
                    self.name
                )));
            }
            Some(_) => {}
        }
        if self.benign_keys.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "policy '{}': benign key pool is empty",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::shipped()
    }
}
