//! In-memory [`MemoryAccess`] implementation
//!
//! A byte vector mapped at a fixed base address. Used by tests and as the
//! fallback when the host has no physical memory windows configured.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use td_model::{MemoryError, Width};
use td_shared::memory::MemoryAccess;

/// Little-endian memory window backed by a `Vec<u8>`
#[derive(Debug, Clone)]
pub struct BufferMemory {
    base: u64,
    bytes: Vec<u8>,
}

impl BufferMemory {
    /// Zero-filled window of `len` bytes starting at `base`
    pub fn new(base: u64, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0; len],
        }
    }

    pub fn with_contents(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn offset(&self, addr: u64, width: Width) -> Result<usize, MemoryError> {
        let bytes = width.bytes();
        if !width.is_aligned(addr) {
            return Err(MemoryError::Misaligned { addr, width: bytes });
        }
        let out_of_bounds = MemoryError::OutOfBounds { addr, width: bytes };
        let offset = addr.checked_sub(self.base).ok_or(out_of_bounds)?;
        let offset = usize::try_from(offset).map_err(|_| out_of_bounds)?;
        match offset.checked_add(bytes) {
            Some(end) if end <= self.bytes.len() => Ok(offset),
            _ => Err(out_of_bounds),
        }
    }
}

impl MemoryAccess for BufferMemory {
    fn read(&mut self, addr: u64, width: Width) -> Result<u32, MemoryError> {
        let offset = self.offset(addr, width)?;
        let value = self.bytes[offset..offset + width.bytes()]
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
        Ok(value)
    }

    fn write(&mut self, addr: u64, width: Width, value: u32) -> Result<(), MemoryError> {
        let offset = self.offset(addr, width)?;
        let le = value.to_le_bytes();
        self.bytes[offset..offset + width.bytes()].copy_from_slice(&le[..width.bytes()]);
        Ok(())
    }
}
