// src/storage.rs - Boot counter and PRNG seed kept in EEPROM

use crate::profile::BootMode;
use crate::rng;
use hidprank_shared::Eeprom;
use rand::rngs::StdRng;

/// Byte address of the boot counter word.
pub const BOOT_COUNT_ADDR: u16 = 0x0000;
/// Byte address of the seed word.
pub const SEED_ADDR: u16 = 0x0002;

/// Factory value of the boot counter.
pub const DEFAULT_BOOT_COUNT: u16 = 0;
/// Factory value of the seed.
pub const DEFAULT_SEED: u16 = 0xCAFE;

/// Boot count used for the run when the reset build flag is set.
pub const RESET_SENTINEL: u16 = 0xFF;

/// The two persisted words as read at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredState {
    pub boot_count: u16,
    pub seed: u16,
}

/// Write the factory image. A freshly flashed device starts from this.
pub fn program_defaults<E: Eeprom>(eeprom: &mut E) {
    eeprom.write_word(BOOT_COUNT_ADDR, DEFAULT_BOOT_COUNT);
    eeprom.write_word(SEED_ADDR, DEFAULT_SEED);
}

/// Owner of the nonvolatile boot counter and seed.
#[derive(Debug)]
pub struct PersistentState<E: Eeprom> {
    eeprom: E,
}

impl<E: Eeprom> PersistentState<E> {
    pub fn new(eeprom: E) -> Self {
        Self { eeprom }
    }

    pub fn load(&self) -> StoredState {
        StoredState {
            boot_count: self.eeprom.read_word(BOOT_COUNT_ADDR),
            seed: self.eeprom.read_word(SEED_ADDR),
        }
    }

    pub fn commit_boot(&mut self, count: u16) {
        self.eeprom.write_word(BOOT_COUNT_ADDR, count);
    }

    pub fn commit_seed(&mut self, value: u16) {
        self.eeprom.write_word(SEED_ADDR, value);
    }

    /// Account for this power-on and return the boot count to run with.
    ///
    /// Normal boots store `count + 1` (saturating) and run with the count as
    /// read. A reset build zeroes the stored counter and runs with
    /// [`RESET_SENTINEL`].
    pub fn register_boot(&mut self, mode: BootMode) -> u16 {
        let stored = self.eeprom.read_word(BOOT_COUNT_ADDR);
        match mode {
            BootMode::Normal => {
                self.commit_boot(stored.saturating_add(1));
                stored
            }
            BootMode::ResetBootCount => {
                tracing::warn!("Resetting stored boot count (was 0x{:04X})", stored);
                self.commit_boot(0);
                RESET_SENTINEL
            }
        }
    }

    /// Seed the generator from the stored seed and immediately persist its
    /// next draw, before any other use of the generator this boot.
    ///
    /// Returns the seed that was read and the generator positioned after
    /// that draw.
    pub fn seed_rng(&mut self) -> (u16, StdRng) {
        let seed = self.eeprom.read_word(SEED_ADDR);
        let mut generator = rng::seeded(seed);
        let next = rng::next_seed(&mut generator, seed);
        self.commit_seed(next);
        (seed, generator)
    }

    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    pub fn into_inner(self) -> E {
        self.eeprom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidprank_simulator::MemoryEeprom;

    fn factory() -> PersistentState<MemoryEeprom> {
        let mut eeprom = MemoryEeprom::new();
        program_defaults(&mut eeprom);
        PersistentState::new(eeprom)
    }

    #[test]
    fn test_factory_image() {
        let state = factory();
        assert_eq!(
            state.load(),
            StoredState { boot_count: 0, seed: 0xCAFE }
        );
    }

    #[test]
    fn test_register_boot_increments() {
        let mut state = factory();
        assert_eq!(state.register_boot(BootMode::Normal), 0);
        assert_eq!(state.register_boot(BootMode::Normal), 1);
        assert_eq!(state.load().boot_count, 2);
    }

    #[test]
    fn test_register_boot_saturates() {
        let mut state = factory();
        state.commit_boot(u16::MAX);
        assert_eq!(state.register_boot(BootMode::Normal), u16::MAX);
        assert_eq!(state.load().boot_count, u16::MAX);
    }

    #[test]
    fn test_reset_mode_uses_sentinel() {
        let mut state = factory();
        state.commit_boot(42);
        assert_eq!(state.register_boot(BootMode::ResetBootCount), RESET_SENTINEL);
        assert_eq!(state.load().boot_count, 0);
    }

    #[test]
    fn test_seed_rotates_every_boot() {
        let mut state = factory();
        let mut seen = vec![state.load().seed];
        for _ in 0..20 {
            let (read, _) = state.seed_rng();
            assert_eq!(read, *seen.last().unwrap());
            let stored = state.load().seed;
            assert_ne!(stored, read);
            seen.push(stored);
        }
    }

    #[test]
    fn test_persisted_seed_is_the_next_draw() {
        let mut state = factory();
        let (seed, _) = state.seed_rng();
        let mut replay = rng::seeded(seed);
        assert_eq!(state.load().seed, rng::next_seed(&mut replay, seed));
    }
}
