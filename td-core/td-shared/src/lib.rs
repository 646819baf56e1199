//! Platform-agnostic seams of the Test Driver shell.
//!
//! The shell core only talks to the outside world through the traits defined
//! here: the operator byte stream, the link to the unit under test, the
//! memory access capability, the external parse/execute/trace pipeline and
//! the system object that owns them.

#![no_std]

pub mod memory;
pub mod pipeline;
pub mod system;
pub mod time;
pub mod transport;

pub use memory::MemoryAccess;
pub use pipeline::{ScriptExecutor, ScriptParser, Tracer, TracerParams};
pub use system::System;
pub use time::TimeProvider;
pub use transport::{RawModeGuard, ShellStream, StreamMode, UutLink};
