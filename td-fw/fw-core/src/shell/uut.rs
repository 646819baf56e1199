//! UUT serial buffer dump and interactive subshell

extern crate alloc;

use alloc::format;
use alloc::string::String;
use td_model::{ShellError, TransportError, Width};

use super::Shell;
use super::hexdump::render;
use crate::memory::BufferMemory;

/// Prompt of the UUT subshell
pub const UUT_PROMPT: &str = "uut>";

impl Shell<'_> {
    /// Hex dump of everything the UUT sent since the last drain
    pub(super) fn uut_dump(&mut self) -> Result<(), ShellError> {
        let received = self.system.uut_link().drain()?;
        if received.is_empty() {
            self.print("UUT serial buffer is empty\n");
            return Ok(());
        }

        let len = received.len();
        let mut buffer = BufferMemory::with_contents(0, received);
        let text = render(&mut buffer, 0, len, 0, Width::Byte, 1)?;
        self.print(&format!("UUT serial buffer ({len} bytes):\n"));
        self.print(&text);
        Ok(())
    }

    /// Forward operator lines to the UUT until `exit` or `~.`
    pub(super) fn uut_shell(&mut self) -> Result<(), ShellError> {
        self.print("UUT serial subshell, type 'exit' or '~.' to return\n");
        loop {
            self.print_uut_output()?;
            self.print(UUT_PROMPT);
            self.flush();

            let Some(line) = self.stream.read_line()? else {
                return Err(TransportError::ConnectionLost.into());
            };
            let command = line.trim_end_matches(['\r', '\n']);
            if command == "exit" || command == "~." {
                log::debug!("uut subshell: leaving");
                return Ok(());
            }

            let mut outgoing = String::from(command);
            outgoing.push('\r');
            self.system.uut_link().write(outgoing.as_bytes())?;
        }
    }

    fn print_uut_output(&mut self) -> Result<(), ShellError> {
        let received = self.system.uut_link().drain()?;
        if !received.is_empty() {
            self.print(&String::from_utf8_lossy(&received));
            if !received.ends_with(b"\n") {
                self.print("\n");
            }
        }
        Ok(())
    }
}
