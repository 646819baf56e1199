//! In-memory system object

use std::collections::VecDeque;

use fw_core::BufferMemory;
use td_model::{FirmwareRegistry, TransportError};
use td_shared::memory::MemoryAccess;
use td_shared::system::System;
use td_shared::time::TimeProvider;
use td_shared::transport::UutLink;

/// Base address of the test memory window
pub const TEST_MEMORY_BASE: u64 = 0x1000;
pub const TEST_MEMORY_LEN: usize = 0x1000;

/// UUT link that records writes and plays back queued replies
#[derive(Debug, Default)]
pub struct FakeUutLink {
    pub sent: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
}

impl FakeUutLink {
    /// Queue bytes returned by the next `drain()`
    pub fn queue_reply(&mut self, data: &[u8]) {
        self.replies.push_back(data.to_vec());
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }
}

impl UutLink for FakeUutLink {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.sent.extend_from_slice(data);
        Ok(())
    }

    fn drain(&mut self) -> Result<Vec<u8>, TransportError> {
        Ok(self.replies.pop_front().unwrap_or_default())
    }
}

/// Clock frozen at a given time
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTime(pub u64);

impl TimeProvider for FixedTime {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

pub struct TestSystem {
    pub firmware: FirmwareRegistry,
    pub uut: FakeUutLink,
    pub memory: BufferMemory,
    pub time: FixedTime,
    pub debug_mode: bool,
    pub print_hardware_lines: bool,
    pub system_shell_runs: usize,
}

impl TestSystem {
    pub fn new() -> Self {
        Self {
            firmware: FirmwareRegistry::new(),
            uut: FakeUutLink::default(),
            memory: BufferMemory::new(TEST_MEMORY_BASE, TEST_MEMORY_LEN),
            time: FixedTime(1_000),
            debug_mode: false,
            print_hardware_lines: false,
            system_shell_runs: 0,
        }
    }
}

impl Default for TestSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TestSystem {
    fn firmware(&self) -> &FirmwareRegistry {
        &self.firmware
    }

    fn firmware_mut(&mut self) -> &mut FirmwareRegistry {
        &mut self.firmware
    }

    fn uut_link(&mut self) -> &mut dyn UutLink {
        &mut self.uut
    }

    fn memory(&mut self) -> &mut dyn MemoryAccess {
        &mut self.memory
    }

    fn time(&self) -> &dyn TimeProvider {
        &self.time
    }

    fn set_debug_mode(&mut self, on: bool) {
        self.debug_mode = on;
    }

    fn set_print_hardware_lines(&mut self, on: bool) {
        self.print_hardware_lines = on;
    }

    fn spawn_system_shell(&mut self) -> Result<(), TransportError> {
        self.system_shell_runs += 1;
        Ok(())
    }
}
