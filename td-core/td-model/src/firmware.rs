//! Firmware slot registry
//!
//! Firmware images uploaded by the PC client are kept in a bounded,
//! append-only list. The test script refers to them by their 1-based upload
//! order, so slots are never reordered or removed once added.

extern crate alloc;

use alloc::vec::Vec;

use crate::error::ShellError;

/// Maximum number of firmware images held at once
pub const FIRMWARE_MAX_COUNT: usize = 8;

/// One uploaded firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareSlot {
    data: Vec<u8>,
}

impl FirmwareSlot {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Bounded, append-only collection of firmware slots
#[derive(Debug, Default)]
pub struct FirmwareRegistry {
    slots: Vec<FirmwareSlot>,
}

impl FirmwareRegistry {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Number of occupied slots
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= FIRMWARE_MAX_COUNT
    }

    /// Slots still free
    pub fn remaining(&self) -> usize {
        FIRMWARE_MAX_COUNT - self.slots.len()
    }

    /// Append a firmware image
    ///
    /// # Returns
    ///
    /// * `Ok(count)` - the new occupancy
    /// * `Err(ShellError::CapacityExceeded)` - registry full, nothing changed
    /// * `Err(ShellError::AllocationFailure)` - slot storage could not grow, nothing changed
    pub fn add(&mut self, blob: Vec<u8>) -> Result<usize, ShellError> {
        if self.is_full() {
            return Err(ShellError::CapacityExceeded {
                max: FIRMWARE_MAX_COUNT,
            });
        }
        self.slots
            .try_reserve(1)
            .map_err(|_| ShellError::AllocationFailure {
                size: core::mem::size_of::<FirmwareSlot>(),
            })?;
        self.slots.push(FirmwareSlot::new(blob));
        Ok(self.slots.len())
    }

    /// Slot by 0-based insertion index
    pub fn get(&self, index: usize) -> Option<&FirmwareSlot> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FirmwareSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_add_reports_new_occupancy() {
        let mut registry = FirmwareRegistry::new();
        assert_eq!(registry.add(vec![1, 2, 3]).unwrap(), 1);
        assert_eq!(registry.add(vec![4]).unwrap(), 2);
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.remaining(), FIRMWARE_MAX_COUNT - 2);
        assert_eq!(registry.get(0).unwrap().data(), &[1, 2, 3]);
        assert_eq!(registry.get(1).unwrap().len(), 1);
    }

    #[test]
    fn test_add_fails_when_full_without_mutation() {
        let mut registry = FirmwareRegistry::new();
        for i in 0..FIRMWARE_MAX_COUNT {
            registry.add(vec![i as u8]).unwrap();
        }
        assert!(registry.is_full());

        let result = registry.add(vec![0xff]);
        assert_eq!(
            result,
            Err(ShellError::CapacityExceeded {
                max: FIRMWARE_MAX_COUNT
            })
        );
        assert_eq!(registry.count(), FIRMWARE_MAX_COUNT);
        // Insertion order preserved
        for (i, slot) in registry.iter().enumerate() {
            assert_eq!(slot.data(), &[i as u8]);
        }
    }
}
