//! Operator shell
//!
//! One [`Shell`] runs one session: it prints the prompt, reads a line,
//! dispatches it and repeats until the operator asks for a reboot or an
//! exit, the stream goes away, or an interrupt is pending. Every script
//! execution requests a reboot, so a session normally ends after one run.

mod commands;
mod handlers;
mod hexdump;
mod ingest;
mod lifecycle;
mod numbers;
mod uut;
mod wrap;

use core::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use td_model::protocol::PROMPT;
use td_model::{ScriptBuffer, ShellError, TransportError};
use td_shared::pipeline::{ScriptExecutor, ScriptParser, Tracer};
use td_shared::system::System;
use td_shared::transport::ShellStream;

pub use commands::{COMMANDS, Command, CommandEntry, dispatch, dispatch_in};
pub use hexdump::{elements_per_line, render as render_hexdump};
pub use ingest::{allocate, receive, receive_into};
pub use lifecycle::{
    DPRAM_NOP_SCRIPT, DPRAM_TEST_SCRIPT, HARD_RESET_SCRIPT, MASTER_RESET_SCRIPT, STATUS_SCRIPT,
};
pub use numbers::parse_number;
pub use uut::UUT_PROMPT;
pub use wrap::{DEFAULT_MINI_SCRIPT_TIMEOUT, MINI_SCRIPT_TC_ID, wrap_direct_command};

/// Version printed by `ver` and `help`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default trace buffer size handed to the tracer
pub const TRACE_BUFFER_DEFAULT_SIZE: usize = 64 * 1024;

/// Default cap on `md` byte counts
pub const MAX_DUMP_BYTES: usize = 800;

/// Shell settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Step timeout written into wrapped direct commands, in milliseconds
    pub mini_script_timeout: u32,
    pub trace_buffer_size: usize,
    /// Largest byte count `md` will dump
    pub max_dump_bytes: usize,
    /// Whether `exit` may end the shell process
    pub allow_exit: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            mini_script_timeout: DEFAULT_MINI_SCRIPT_TIMEOUT,
            trace_buffer_size: TRACE_BUFFER_DEFAULT_SIZE,
            max_dump_bytes: MAX_DUMP_BYTES,
            allow_exit: true,
        }
    }
}

/// Per-session shell state
#[derive(Debug, Default)]
pub struct ShellState {
    /// Pending script, if any
    pub script: Option<ScriptBuffer>,
    /// The pending script is a single operator line, not an uploaded file
    pub direct_command: bool,
    pub reboot_requested: bool,
    pub exit_requested: bool,
    pub debug_mode: bool,
    pub suppress_timestamps: bool,
    pub print_hardware_lines: bool,
}

/// The three external pipeline stages
pub struct Pipeline<'a> {
    pub parser: &'a mut dyn ScriptParser,
    pub executor: &'a mut dyn ScriptExecutor,
    pub tracer: &'a mut dyn Tracer,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `exit` was accepted; the process should stop
    Exit,
    /// `reboot`, or any script execution
    Reboot,
    /// SIGINT seen after a line read
    Interrupted,
    /// The operator stream reached end of input or failed
    Disconnected,
}

pub struct Shell<'a> {
    config: ShellConfig,
    state: ShellState,
    stream: &'a mut dyn ShellStream,
    system: &'a mut dyn System,
    pipeline: Pipeline<'a>,
    disconnected: bool,
}

impl<'a> Shell<'a> {
    pub fn new(
        config: ShellConfig,
        stream: &'a mut dyn ShellStream,
        system: &'a mut dyn System,
        pipeline: Pipeline<'a>,
    ) -> Self {
        Self {
            config,
            state: ShellState::default(),
            stream,
            system,
            pipeline,
            disconnected: false,
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    pub fn into_state(self) -> ShellState {
        self.state
    }

    /// Run the read-dispatch loop until the session ends
    ///
    /// `interrupt` is checked once after every line read, so a pending
    /// interrupt takes effect when the next line arrives. An upload in
    /// progress is never cut short by it.
    pub fn run(&mut self, interrupt: &AtomicBool) -> SessionEnd {
        log::info!("Shell session started");
        loop {
            self.print(PROMPT);
            self.flush();

            let line = match self.stream.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::info!("Operator stream closed");
                    return SessionEnd::Disconnected;
                }
                Err(e) => {
                    log::error!("Operator stream failed: {e}");
                    return SessionEnd::Disconnected;
                }
            };

            if interrupt.swap(false, Ordering::SeqCst) {
                log::info!("Interrupted, ending session");
                return SessionEnd::Interrupted;
            }

            if !line.trim().is_empty() {
                self.handle_line(&line);
                self.flush();
            }

            if let Some(end) = self.session_end() {
                log::info!("Shell session ended: {end:?}");
                return end;
            }
        }
    }

    /// Dispatch one input line
    pub fn handle_line(&mut self, line: &str) {
        let (name, result) = match dispatch(line) {
            Some((entry, rest)) => {
                log::debug!("dispatch: '{}' rest={rest:?}", entry.name);
                (entry.name, self.execute_command(entry.command, line, rest))
            }
            None => {
                log::debug!("dispatch: direct command {line:?}");
                ("direct command", self.submit_direct(line.as_bytes()))
            }
        };
        if let Err(e) = result {
            self.command_failed(name, &e);
        }
    }

    fn command_failed(&mut self, name: &str, err: &ShellError) {
        if matches!(
            err,
            ShellError::Transport(TransportError::ConnectionLost)
                | ShellError::TransferFailure(TransportError::ConnectionLost)
        ) {
            self.disconnected = true;
        }
        log::warn!("{name}: {err}");
    }

    fn session_end(&self) -> Option<SessionEnd> {
        if self.state.exit_requested {
            Some(SessionEnd::Exit)
        } else if self.state.reboot_requested {
            Some(SessionEnd::Reboot)
        } else if self.disconnected {
            Some(SessionEnd::Disconnected)
        } else {
            None
        }
    }

    fn execute_command(
        &mut self,
        command: Command,
        line: &str,
        rest: &str,
    ) -> Result<(), ShellError> {
        match command {
            Command::UploadTestData => self.upload_test_data(),
            Command::UploadFirmware => self.upload_firmware(),
            Command::DebugMode => self.set_debug_mode(),
            Command::Timestamps => self.set_timestamps(),
            Command::PrintHardwareLines => self.set_print_hardware_lines(),
            Command::MemoryDump => self.memory_dump(line),
            Command::MemoryRead => self.memory_read(line),
            Command::MemoryWrite => self.memory_write(line),
            Command::DpramTest => self.submit_direct(DPRAM_TEST_SCRIPT.as_bytes()),
            Command::DpramNop => self.submit_direct(DPRAM_NOP_SCRIPT.as_bytes()),
            Command::Reboot => {
                self.state.reboot_requested = true;
                Ok(())
            }
            Command::Status => self.submit_direct(STATUS_SCRIPT.as_bytes()),
            Command::Help => {
                self.print_usage();
                Ok(())
            }
            Command::Run => self.execute(),
            Command::UutDump => self.uut_dump(),
            Command::UutMasterReset => self.submit_direct(MASTER_RESET_SCRIPT.as_bytes()),
            Command::UutHardReset => self.submit_direct(HARD_RESET_SCRIPT.as_bytes()),
            Command::Exit => {
                self.exit();
                Ok(())
            }
            Command::Linux => self.linux(),
            Command::UutShell => self.uut_shell(),
            Command::Version => {
                self.print_version();
                Ok(())
            }
            Command::Comment => {
                log::debug!("comment:{}", rest.trim_end());
                Ok(())
            }
        }
    }

    /// Write operator text; failures are logged, not propagated
    fn print(&mut self, text: &str) {
        if let Err(e) = self.stream.write_str(text) {
            log::warn!("shell: write failed: {e}");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.stream.flush() {
            log::warn!("shell: flush failed: {e}");
        }
    }
}
