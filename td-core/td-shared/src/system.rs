//! The system object handed to the shell and the script pipeline

use crate::memory::MemoryAccess;
use crate::time::TimeProvider;
use crate::transport::UutLink;
use td_model::{FirmwareRegistry, TransportError};

/// Everything the shell and the pipeline need from the machine they run on
///
/// One system object lives for the whole process. The firmware registry is
/// owned here so that uploaded images outlive individual shell sessions.
pub trait System {
    fn firmware(&self) -> &FirmwareRegistry;

    fn firmware_mut(&mut self) -> &mut FirmwareRegistry;

    /// Serial link to the unit under test
    fn uut_link(&mut self) -> &mut dyn UutLink;

    fn memory(&mut self) -> &mut dyn MemoryAccess;

    fn time(&self) -> &dyn TimeProvider;

    fn set_debug_mode(&mut self, on: bool);

    fn set_print_hardware_lines(&mut self, on: bool);

    /// Run the subordinate system shell and wait for it to exit
    fn spawn_system_shell(&mut self) -> Result<(), TransportError>;
}
