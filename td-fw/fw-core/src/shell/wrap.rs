//! Minimal script wrapping for direct commands
//!
//! A single operator line (or a canned command sequence) is turned into a
//! one-test script so it can go through the same parser and executor as an
//! uploaded test data file.

extern crate alloc;

use alloc::format;
use alloc::vec::Vec;
use td_model::{ScriptBuffer, ShellError};

/// Pseudo test case id of a wrapped command
pub const MINI_SCRIPT_TC_ID: u32 = 9999;
pub const MINI_SCRIPT_REPEAT_COUNT: u32 = 1;
pub const MINI_SCRIPT_STOP_ON_FAILURE: u32 = 1;
pub const MINI_SCRIPT_FLUSH_ON_END: u32 = 1;
/// Default step timeout of a wrapped command, in milliseconds
pub const DEFAULT_MINI_SCRIPT_TIMEOUT: u32 = 5000;

/// Wrap `body` into a minimal script: begin, body, end, execute
pub fn wrap_direct_command(body: &[u8], timeout: u32) -> Result<ScriptBuffer, ShellError> {
    let begin = format!("T>BEGIN {MINI_SCRIPT_TC_ID}\n");
    let end = format!("T>END {MINI_SCRIPT_TC_ID}\n");
    let execute = format!(
        "T>EX {MINI_SCRIPT_TC_ID} {MINI_SCRIPT_REPEAT_COUNT} \
         {MINI_SCRIPT_STOP_ON_FAILURE} {timeout} {MINI_SCRIPT_FLUSH_ON_END}\n"
    );
    let needs_newline = !body.ends_with(b"\n");

    let size = begin.len() + body.len() + usize::from(needs_newline) + end.len() + execute.len();
    let mut script = Vec::new();
    script
        .try_reserve_exact(size)
        .map_err(|_| ShellError::AllocationFailure { size })?;

    script.extend_from_slice(begin.as_bytes());
    script.extend_from_slice(body);
    if needs_newline {
        script.push(b'\n');
    }
    script.extend_from_slice(end.as_bytes());
    script.extend_from_slice(execute.as_bytes());
    Ok(ScriptBuffer::new(script))
}
