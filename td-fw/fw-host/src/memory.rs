//! Physical memory windows mapped from `/dev/mem`
//!
//! Each configured window is mapped once at startup. Accesses are checked
//! against the windows and performed with volatile loads and stores of the
//! requested width; nothing else in the shell touches raw pointers.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::ptr;

use anyhow::{Context, Result, bail};
use td_model::{MemoryError, Width};
use td_shared::memory::MemoryAccess;

use crate::config::MemoryWindowConfig;

struct Window {
    base: u64,
    len: usize,
    /// Start of the mapping (page aligned, at or below `base`)
    map: *mut libc::c_void,
    map_len: usize,
    /// Offset of `base` inside the mapping
    lead: usize,
}

impl Window {
    fn contains(&self, addr: u64, bytes: usize) -> bool {
        addr >= self.base && addr - self.base + bytes as u64 <= self.len as u64
    }

    fn ptr(&self, addr: u64) -> *mut u8 {
        let offset = self.lead + (addr - self.base) as usize;
        // SAFETY: `contains` was checked by the caller, so offset is inside the mapping
        unsafe { self.map.cast::<u8>().add(offset) }
    }
}

/// Set of mapped physical windows
pub struct MappedMemory {
    windows: Vec<Window>,
}

impl MappedMemory {
    /// No windows: every access is out of bounds
    pub fn empty() -> Self {
        Self {
            windows: Vec::new(),
        }
    }

    /// Map `windows` from `/dev/mem`
    pub fn open(windows: &[MemoryWindowConfig]) -> Result<Self> {
        if windows.is_empty() {
            return Ok(Self::empty());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .context("Failed to open /dev/mem")?;

        // SAFETY: sysconf has no preconditions
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page = u64::try_from(page).context("Failed to query page size")?;

        let mut mapped = Self::empty();
        for config in windows {
            if config.len == 0 {
                bail!("Memory window at 0x{:08x} has zero length", config.base);
            }
            let map_base = config.base & !(page - 1);
            let lead = (config.base - map_base) as usize;
            let map_len = lead + config.len;
            let offset = libc::off_t::try_from(map_base)
                .with_context(|| format!("Window base 0x{map_base:x} out of range"))?;

            // SAFETY: mapping a file range; the result is checked before use
            let map = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    map_len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    file.as_raw_fd(),
                    offset,
                )
            };
            if map == libc::MAP_FAILED {
                return Err(std::io::Error::last_os_error()).with_context(|| {
                    format!(
                        "Failed to map memory window 0x{:08x}+0x{:x}",
                        config.base, config.len
                    )
                });
            }

            log::info!(
                "Mapped memory window 0x{:08x}+0x{:x}",
                config.base,
                config.len
            );
            mapped.windows.push(Window {
                base: config.base,
                len: config.len,
                map,
                map_len,
                lead,
            });
        }
        Ok(mapped)
    }

    fn find(&self, addr: u64, width: Width) -> Result<&Window, MemoryError> {
        let bytes = width.bytes();
        if !width.is_aligned(addr) {
            return Err(MemoryError::Misaligned { addr, width: bytes });
        }
        self.windows
            .iter()
            .find(|w| w.contains(addr, bytes))
            .ok_or(MemoryError::OutOfBounds { addr, width: bytes })
    }
}

impl MemoryAccess for MappedMemory {
    fn read(&mut self, addr: u64, width: Width) -> Result<u32, MemoryError> {
        let p = self.find(addr, width)?.ptr(addr);
        // SAFETY: in bounds of a live mapping and aligned for the width
        let value = unsafe {
            match width {
                Width::Byte => u32::from(ptr::read_volatile(p)),
                Width::Half => u32::from(ptr::read_volatile(p.cast::<u16>())),
                Width::Word => ptr::read_volatile(p.cast::<u32>()),
            }
        };
        Ok(value)
    }

    fn write(&mut self, addr: u64, width: Width, value: u32) -> Result<(), MemoryError> {
        let p = self.find(addr, width)?.ptr(addr);
        // SAFETY: in bounds of a live mapping and aligned for the width
        unsafe {
            match width {
                Width::Byte => ptr::write_volatile(p, value as u8),
                Width::Half => ptr::write_volatile(p.cast::<u16>(), value as u16),
                Width::Word => ptr::write_volatile(p.cast::<u32>(), value),
            }
        }
        Ok(())
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        for window in &self.windows {
            // SAFETY: unmapping exactly what was mapped in `open`
            unsafe {
                libc::munmap(window.map, window.map_len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rejects_everything() {
        let mut memory = MappedMemory::empty();
        assert_eq!(
            memory.read(0x1000, Width::Word),
            Err(MemoryError::OutOfBounds {
                addr: 0x1000,
                width: 4
            })
        );
        assert_eq!(
            memory.write(0x1001, Width::Half, 1),
            Err(MemoryError::Misaligned {
                addr: 0x1001,
                width: 2
            })
        );
    }
}
