//! ROM image access
//!
//! Everything downstream reads the cartridge through [`RomSource`], a
//! read-only, bounds-checked byte view. [`RomImage`] is the in-memory
//! implementation; it strips the optional 512-byte copier header on load.

use crate::logging::{log, LogCategory, LogLevel};
use std::path::Path;
use thiserror::Error;

/// Size of the copier (SMC) header some dumps carry in front of the ROM.
pub const COPIER_HEADER_SIZE: usize = 512;

#[derive(Error, Debug)]
pub enum RomError {
    #[error("Read of {len} byte(s) at {offset:#08X} exceeds ROM size {size:#08X}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("Invalid ROM format: {0}")]
    InvalidRom(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only byte view of a ROM image.
///
/// Implementations must be shareable across threads; the renderer and the
/// sheet cache are used from several threads at once.
pub trait RomSource: Send + Sync {
    /// Total number of bytes
    fn size(&self) -> usize;

    /// Read a single byte
    fn read_byte(&self, offset: usize) -> Result<u8, RomError>;

    /// Read a little-endian 16-bit word
    fn read_word_le(&self, offset: usize) -> Result<u16, RomError> {
        let lo = self.read_byte(offset)?;
        let hi = self.read_byte(offset.checked_add(1).ok_or(RomError::OutOfBounds {
            offset,
            len: 2,
            size: self.size(),
        })?)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Read a little-endian signed 16-bit value
    fn read_i16_le(&self, offset: usize) -> Result<i16, RomError> {
        self.read_word_le(offset).map(|w| w as i16)
    }

    /// Read a little-endian 24-bit long address
    fn read_long_le(&self, offset: usize) -> Result<u32, RomError> {
        let word = self.read_word_le(offset)? as u32;
        let bank = self.read_byte(offset + 2)? as u32;
        Ok(word | (bank << 16))
    }

    /// Borrow `len` bytes starting at `offset`
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], RomError>;
}

/// In-memory ROM image
#[derive(Debug, Clone)]
pub struct RomImage {
    data: Vec<u8>,
}

impl RomImage {
    /// Wrap raw bytes. A copier header is stripped when the length says one
    /// is present.
    pub fn new(mut data: Vec<u8>) -> Result<Self, RomError> {
        if data.len() % 1024 == COPIER_HEADER_SIZE {
            log(LogCategory::Rom, LogLevel::Info, || {
                "Copier header detected, stripping 512 bytes".to_string()
            });
            data.drain(..COPIER_HEADER_SIZE);
        }
        if data.is_empty() {
            return Err(RomError::InvalidRom("ROM image is empty".to_string()));
        }
        Ok(Self { data })
    }

    /// Wrap bytes exactly as given, with no header detection.
    ///
    /// Used for synthetic images in tests and tools.
    pub fn from_raw(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Load a ROM file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RomError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        log(LogCategory::Rom, LogLevel::Info, || {
            format!("Loaded {} ({} bytes)", path.display(), data.len())
        });
        Self::new(data)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl RomSource for RomImage {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read_byte(&self, offset: usize) -> Result<u8, RomError> {
        self.data.get(offset).copied().ok_or(RomError::OutOfBounds {
            offset,
            len: 1,
            size: self.data.len(),
        })
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], RomError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(RomError::OutOfBounds {
                offset,
                len,
                size: self.data.len(),
            })
    }
}

/// Translate a LoROM SNES bus address to a file offset.
///
/// The bank's high bit (FastROM mirror) is ignored and each bank maps
/// 32 KiB of file space.
pub fn snes_to_pc(addr: u32) -> usize {
    (((addr & 0x7F_0000) >> 1) | (addr & 0x7FFF)) as usize
}

/// Inverse of [`snes_to_pc`], producing a FastROM bank address.
pub fn pc_to_snes(offset: usize) -> u32 {
    let offset = offset as u32;
    (((offset << 1) & 0x7F_0000) | (offset & 0x7FFF) | 0x8000) | 0x80_0000
}
