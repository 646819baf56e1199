//! Operator-facing protocol text
//!
//! The PC client drives the shell the same way a person at a terminal
//! would: it sends command lines and waits for known phrases. Both sides
//! take those phrases from here.

extern crate alloc;

use alloc::format;
use alloc::string::String;

/// Shell prompt
pub const PROMPT: &str = "td>";

pub const CMD_UPLOAD_TESTDATA: &str = "upload testdata";
pub const CMD_UPLOAD_FIRMWARE: &str = "upload firmware";
pub const CMD_DEBUG_MODE: &str = "td debugmode";
pub const CMD_TIMESTAMPS: &str = "td timestamps";
pub const CMD_RUN: &str = "run";

pub const PROMPT_TESTDATA_LENGTH: &str = "Enter TestDataFile Length: ";

/// Printed once a binary upload has been fully received
pub const FILE_LOADED: &str = "File Loaded successfully over RS232";

/// Printed after a file-uploaded script has been torn down
pub const EXECUTION_FINISHED: &str = "Test Execution Finished";

/// Legacy reply for a direct command the parser rejects
pub const BAD_COMMAND: &str = "Bad command";

pub fn firmware_length_prompt(number: usize) -> String {
    format!("Enter Firmware {number} File Length: ")
}

/// Announcement sent right before the test data bytes are expected
pub fn transfer_testdata_message(length: usize) -> String {
    format!("Transfer Test Data File in Binary ({length} bytes)")
}

/// Announcement sent right before firmware `number` bytes are expected
pub fn transfer_firmware_message(number: usize, length: usize) -> String {
    format!("Transfer Firmware {number} in Binary ({length} bytes)")
}
