// hidprank_simulator: host implementations of the firmware's hardware seams

pub mod eeprom;
pub mod keyboard;
pub mod led;
pub mod timer;

pub use eeprom::{EepromError, FileEeprom, MemoryEeprom, EEPROM_SIZE};
pub use keyboard::{KeyEvent, RecordingKeyboard};
pub use led::SimLed;
pub use timer::{ScaledDelay, ThreadTimer, VirtualDelay, VirtualTimer};
