//! Action primitives. Each one is fire-and-forget against the keyboard.

use crate::policy::{KeyChord, RickrollConfig, TauntConfig};
use crate::rng::random_below;
use hidprank_shared::{DelayMs, KeyCode, Keyboard, Modifiers, StatusLed};
use rand::Rng;

/// Press one key drawn uniformly from `pool`.
pub fn benign_key<K, R>(keyboard: &mut K, pool: &[KeyChord], rng: &mut R)
where
    K: Keyboard + ?Sized,
    R: Rng,
{
    if pool.is_empty() {
        return;
    }
    let chord = pool[random_below(rng, pool.len() as u32) as usize];
    tracing::debug!("Non-intrusive key {}", chord.key);
    keyboard.press(chord.key, chord.modifiers);
}

/// Open the run prompt, wait for it, type the URL and submit.
pub fn rickroll<K, D>(keyboard: &mut K, delay: &mut D, config: &RickrollConfig)
where
    K: Keyboard + ?Sized,
    D: DelayMs + ?Sized,
{
    tracing::debug!("Rickroll!");
    keyboard.press(config.shortcut.key, config.shortcut.modifiers);
    delay.delay_ms(config.settle_ms);
    keyboard.type_str(&config.url);
    keyboard.press(KeyCode::ENTER, Modifiers::NONE);
}

/// Optionally press the taunt shortcut, then type the taunt.
pub fn taunt<K>(keyboard: &mut K, config: &TauntConfig)
where
    K: Keyboard + ?Sized,
{
    tracing::debug!("Taunt");
    if let Some(chord) = config.shortcut {
        keyboard.press(chord.key, chord.modifiers);
    }
    keyboard.type_str(&config.text);
}

/// Blink the status LED `toggles` times, `interval_ms` apart. Nothing
/// reaches the host.
pub fn no_op_blink<L, D>(led: &L, delay: &mut D, toggles: u32, interval_ms: u32)
where
    L: StatusLed + ?Sized,
    D: DelayMs + ?Sized,
{
    tracing::debug!("NO-OP");
    for _ in 0..toggles {
        led.toggle();
        delay.delay_ms(interval_ms);
    }
}
