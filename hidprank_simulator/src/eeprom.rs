//! EEPROM backends: a plain in-memory array and a file-backed image.

use hidprank_shared::Eeprom;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Size of the simulated EEPROM (ATmega32U4: 1 KiB).
pub const EEPROM_SIZE: usize = 1024;

const ERASED: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum EepromError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("EEPROM image '{path}' is {len} bytes, expected {expected}")]
    BadImage { path: PathBuf, len: usize, expected: usize },
}

/// EEPROM contents held in memory. Starts erased (all 0xFF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEeprom {
    bytes: Vec<u8>,
    writes: u64,
}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEeprom {
    pub fn new() -> Self {
        Self { bytes: vec![ERASED; EEPROM_SIZE], writes: 0 }
    }

    fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if no cell has ever been programmed.
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(|&b| b == ERASED)
    }

    /// Number of word writes since this image was created or loaded.
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl Eeprom for MemoryEeprom {
    fn read_word(&self, addr: u16) -> u16 {
        let addr = addr as usize;
        match self.bytes.get(addr..addr + 2) {
            Some(cells) => u16::from_le_bytes([cells[0], cells[1]]),
            None => {
                tracing::warn!("EEPROM read past end at 0x{:04X}", addr);
                u16::from_le_bytes([ERASED, ERASED])
            }
        }
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        let addr = addr as usize;
        match self.bytes.get_mut(addr..addr + 2) {
            Some(cells) => {
                cells.copy_from_slice(&value.to_le_bytes());
                self.writes += 1;
            }
            None => tracing::warn!("EEPROM write past end at 0x{:04X} dropped", addr),
        }
    }
}

/// EEPROM image persisted to a file on every write, so state survives
/// simulator restarts the way the real part survives power cycles.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    image: MemoryEeprom,
}

impl FileEeprom {
    /// Open an existing image, or start from an erased one if the file does
    /// not exist yet. Nothing is written until the first `write_word`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EepromError> {
        let path = path.as_ref().to_path_buf();
        let image = if path.exists() {
            let bytes = std::fs::read(&path)?;
            if bytes.len() != EEPROM_SIZE {
                return Err(EepromError::BadImage {
                    path,
                    len: bytes.len(),
                    expected: EEPROM_SIZE,
                });
            }
            tracing::debug!("Loaded EEPROM image from {}", path.display());
            MemoryEeprom::from_bytes(bytes)
        } else {
            tracing::info!("No EEPROM image at {}, starting erased", path.display());
            MemoryEeprom::new()
        };
        Ok(Self { path, image })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_blank(&self) -> bool {
        self.image.is_blank()
    }

    pub fn image(&self) -> &MemoryEeprom {
        &self.image
    }

    fn persist(&self) -> Result<(), EepromError> {
        std::fs::write(&self.path, self.image.as_bytes())?;
        Ok(())
    }
}

impl Eeprom for FileEeprom {
    fn read_word(&self, addr: u16) -> u16 {
        self.image.read_word(addr)
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        self.image.write_word(addr, value);
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to persist EEPROM image '{}': {}", self.path.display(), e);
        }
    }
}
