//! Test Driver PC client library.
//!
//! Drives the Test Driver shell over a serial line the way an operator
//! would: it types commands, waits for known phrases and streams binary
//! uploads once the shell asks for them.

pub mod commands;
pub mod report;
pub mod session;
pub mod testdata;

#[cfg(test)]
pub(crate) mod testing;

pub use session::{DriverSession, open_port};
pub use testdata::{FirmwareRef, TestData};
