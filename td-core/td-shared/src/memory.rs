//! Memory peek/poke capability

use td_model::{MemoryError, Width};

/// Width-checked access to device memory
///
/// Implementations validate alignment and bounds; callers never see a raw
/// pointer. Values are carried in a `u32` regardless of width, zero-extended
/// on read and truncated on write.
pub trait MemoryAccess {
    fn read(&mut self, addr: u64, width: Width) -> Result<u32, MemoryError>;

    fn write(&mut self, addr: u64, width: Width, value: u32) -> Result<(), MemoryError>;
}
