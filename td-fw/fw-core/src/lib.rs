//! Test Driver shell core.
//!
//! This crate holds the operator shell: the command table and dispatcher, the
//! binary upload protocol, the script execution lifecycle and the hex dump
//! formatter. Everything platform-specific comes in through the traits in
//! `td-shared`, so the same shell runs on the board and inside tests.

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod memory;
pub mod shell;
pub mod transport;

pub use memory::BufferMemory;
pub use shell::{
    COMMANDS, Command, CommandEntry, Pipeline, SessionEnd, Shell, ShellConfig, ShellState,
    VERSION, wrap_direct_command,
};
pub use transport::FakeStream;
