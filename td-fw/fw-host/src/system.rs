//! System object for the Linux test driver board

use std::process::Command;
use std::time::Instant;

use log::LevelFilter;
use td_model::{FirmwareRegistry, TransportError};
use td_shared::memory::MemoryAccess;
use td_shared::system::System;
use td_shared::time::TimeProvider;
use td_shared::transport::UutLink;

use crate::memory::MappedMemory;
use crate::uut::SerialUutLink;

/// Milliseconds since process start
pub struct HostTime {
    start: Instant,
}

impl HostTime {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for HostTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for HostTime {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

pub struct HostSystem {
    firmware: FirmwareRegistry,
    uut: SerialUutLink,
    memory: MappedMemory,
    time: HostTime,
    /// Log level restored when debug mode is switched off
    base_level: LevelFilter,
    shell_program: String,
}

impl HostSystem {
    pub fn new(uut: SerialUutLink, memory: MappedMemory) -> Self {
        Self {
            firmware: FirmwareRegistry::new(),
            uut,
            memory,
            time: HostTime::new(),
            base_level: log::max_level(),
            shell_program: "/bin/sh".to_string(),
        }
    }
}

impl System for HostSystem {
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
        let level = if on {
            LevelFilter::Debug.max(self.base_level)
        } else {
            self.base_level
        };
        log::set_max_level(level);
        log::info!("Debug mode {}", if on { "on" } else { "off" });
    }

    fn set_print_hardware_lines(&mut self, on: bool) {
        self.uut.set_echo(on);
    }

    fn spawn_system_shell(&mut self) -> Result<(), TransportError> {
        log::info!("Starting {}", self.shell_program);
        let status = Command::new(&self.shell_program)
            .status()
            .map_err(|e| TransportError::Io(format!("{}: {e}", self.shell_program)))?;
        log::info!("{} exited with {status}", self.shell_program);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_time_is_monotonic() {
        let time = HostTime::new();
        let start = time.now_ms();
        assert!(time.now_ms() >= start);
        assert_eq!(time.elapsed_ms(time.now_ms() + 10_000), 0);
    }

    #[test]
    fn test_print_hardware_lines_flag() {
        let mut system = HostSystem::new(SerialUutLink::detached(), MappedMemory::empty());
        assert!(!system.uut.echo());
        system.set_print_hardware_lines(true);
        assert!(system.uut.echo());
        assert!(system.uut_link().drain().unwrap().is_empty());
    }
}
