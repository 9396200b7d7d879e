use hidprank_shared::StatusLed;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Status LED that remembers its level and how often it was toggled.
#[derive(Debug, Default)]
pub struct SimLed {
    initialized: AtomicBool,
    on: AtomicBool,
    toggles: AtomicU64,
}

impl SimLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn toggle_count(&self) -> u64 {
        self.toggles.load(Ordering::Acquire)
    }
}

impl StatusLed for SimLed {
    fn init(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    fn toggle(&self) {
        self.on.fetch_xor(true, Ordering::AcqRel);
        self.toggles.fetch_add(1, Ordering::AcqRel);
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }
}
