//! Command table and dispatcher
//!
//! Dispatch is a first-match textual prefix scan over [`COMMANDS`] in
//! declaration order. A longer name that shares a prefix with a shorter one
//! must come first (`uut dump` before `uut`), otherwise it can never match.

/// Operation selected by a command table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    UploadTestData,
    UploadFirmware,
    DebugMode,
    Timestamps,
    PrintHardwareLines,
    MemoryDump,
    MemoryRead,
    MemoryWrite,
    DpramTest,
    DpramNop,
    Reboot,
    Status,
    Help,
    Run,
    UutDump,
    UutMasterReset,
    UutHardReset,
    Exit,
    Linux,
    UutShell,
    Version,
    Comment,
}

/// One row of the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub command: Command,
}

const fn entry(name: &'static str, description: &'static str, command: Command) -> CommandEntry {
    CommandEntry {
        name,
        description,
        command,
    }
}

/// Operator command table, in match order
pub static COMMANDS: &[CommandEntry] = &[
    entry("upload testdata", "Upload testcase data file to Test Driver", Command::UploadTestData),
    entry("upload firmware", "Upload firmware file to Test Driver", Command::UploadFirmware),
    entry("td debugmode", "Set Test Driver debug mode ON/OFF", Command::DebugMode),
    entry("td timestamps", "Turn ON/OFF time stamp on traces", Command::Timestamps),
    entry(
        "td printhardwarelines",
        "Prints Hardware Lines Status (Ready, Start, Done etc)",
        Command::PrintHardwareLines,
    ),
    entry("md", "Dump Memory contents", Command::MemoryDump),
    entry("mr", "Read from memory", Command::MemoryRead),
    entry("mw", "Write data into memory", Command::MemoryWrite),
    entry("dpram test", "DPRAM Memory Test", Command::DpramTest),
    entry("dpram nop", "Execute DPRAM NOP", Command::DpramNop),
    entry("reboot", "Reboot Test Driver", Command::Reboot),
    entry("status", "Display status of UUT", Command::Status),
    entry("help", "Print Usage", Command::Help),
    entry("run", "Execute Tests", Command::Run),
    entry("uut dump", "Dump UUT Serial Buffer", Command::UutDump),
    entry("uut masterreset", "Master Reset UUT via GPIO", Command::UutMasterReset),
    entry("uut hardreset", "Hard Reset UUT via GPIO", Command::UutHardReset),
    entry("exit", "Exit Test Driver", Command::Exit),
    entry("linux", "Start Linux System Shell", Command::Linux),
    entry("uut", "Start UUT Serial Subshell", Command::UutShell),
    entry("ver", "Print version info", Command::Version),
    entry("#", "Comment line", Command::Comment),
    entry("?", "Print Usage", Command::Help),
];

/// Find the command a line names
///
/// # Returns
///
/// * `Some((entry, rest))` - first entry whose name prefixes `line`, and the
///   text after that prefix, verbatim
/// * `None` - no entry matches; the line is a direct script command
pub fn dispatch(line: &str) -> Option<(&'static CommandEntry, &str)> {
    dispatch_in(COMMANDS, line)
}

/// [`dispatch`] over an arbitrary table, keeping its first-prefix-match rule
pub fn dispatch_in<'a>(
    table: &'static [CommandEntry],
    line: &'a str,
) -> Option<(&'static CommandEntry, &'a str)> {
    table
        .iter()
        .find_map(|entry| line.strip_prefix(entry.name).map(|rest| (entry, rest)))
}
