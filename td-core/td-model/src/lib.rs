//! Shared vocabulary for the Test Driver shell and its PC-side client.
//!
//! Holds the data types that cross crate boundaries: the error taxonomy,
//! firmware slots, the pending script buffer, memory access widths and the
//! operator-facing protocol text that the PC client matches against.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod firmware;
pub mod memory;
pub mod protocol;
pub mod script;

pub use error::{MemoryError, PipelineError, ScriptFailure, ShellError, Stage, TransportError};
pub use firmware::{FIRMWARE_MAX_COUNT, FirmwareRegistry, FirmwareSlot};
pub use memory::Width;
pub use script::ScriptBuffer;
