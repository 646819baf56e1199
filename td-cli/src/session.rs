//! Line-level conversation with the Test Driver shell

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serialport::SerialPort;
use td_model::protocol::PROMPT;

/// Default baud rate of the Test Driver console
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// How long one read on the port may block
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Bytes per write while streaming a file
const BLOCK_SIZE: usize = 8 * 1024;

/// Phrases the shell prints when an upload or command is refused
const REFUSALS: [&str; 5] = [
    "Invalid length",
    "Limit reached",
    "firmware files exist",
    "Failed to allocate",
    "Download failed",
];

/// Open the Test Driver console
pub fn open_port(port_name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
    log::info!("Connecting to {port_name} @ {baud_rate} baud");
    serialport::new(port_name, baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("Failed to open serial port {port_name}"))
}

/// Conversation with the shell over any byte port
pub struct DriverSession<P: Read + Write> {
    port: P,
    /// Consecutive empty reads tolerated while waiting for a phrase
    idle_limit: u32,
    /// Same, while streaming trace output; `None` waits forever
    execution_idle_limit: Option<u32>,
}

impl<P: Read + Write> DriverSession<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            // 10 s at the default read timeout
            idle_limit: 100,
            execution_idle_limit: None,
        }
    }

    pub fn with_idle_limits(mut self, idle_limit: u32, execution_idle_limit: Option<u32>) -> Self {
        self.idle_limit = idle_limit;
        self.execution_idle_limit = execution_idle_limit;
        self
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Send text to the shell
    pub fn send(&mut self, text: &str) -> Result<()> {
        log::debug!("PC> {text:?}");
        self.send_bytes(text.as_bytes())
    }

    fn send_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .and_then(|()| self.port.flush())
            .context("Failed to write to serial port")
    }

    /// Stream `data` in blocks
    pub fn send_file_data(&mut self, data: &[u8]) -> Result<()> {
        for block in data.chunks(BLOCK_SIZE) {
            self.send_bytes(block)?;
        }
        log::debug!("PC> {} bytes of binary data", data.len());
        Ok(())
    }

    /// Read one line
    ///
    /// # Returns
    ///
    /// * `Ok(Some(line))` - a full line, or the partial line received before
    ///   the port timed out (prompts are not newline terminated)
    /// * `Ok(None)` - nothing arrived within one read timeout
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut buffer = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    buffer.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read from serial port"),
            }
        }
        if buffer.is_empty() {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buffer).into_owned();
        log::debug!("TD< {line:?}");
        Ok(Some(line))
    }

    /// Read lines until one satisfies `check`
    ///
    /// `check` returns `Ok(true)` to stop, `Ok(false)` to keep reading and
    /// an error to abort. A line containing one of the shell's refusal
    /// phrases aborts as well.
    pub fn wait_until(
        &mut self,
        what: &str,
        mut check: impl FnMut(&mut Self, &str) -> Result<bool>,
    ) -> Result<String> {
        let mut idle = 0;
        loop {
            let Some(line) = self.read_line()? else {
                idle += 1;
                if idle >= self.idle_limit {
                    bail!("Timed out waiting for {what}");
                }
                continue;
            };
            idle = 0;
            if let Some(refusal) = REFUSALS.iter().find(|r| line.contains(*r)) {
                bail!("Test Driver refused ({refusal}): {}", line.trim());
            }
            if check(self, &line)? {
                return Ok(line);
            }
        }
    }

    /// Read lines until one contains `needle`
    pub fn wait_for(&mut self, needle: &str) -> Result<String> {
        self.wait_until(&format!("'{needle}'"), |_, line| Ok(line.contains(needle)))
    }

    pub fn wait_for_prompt(&mut self) -> Result<()> {
        self.wait_for(PROMPT).map(|_| ())
    }

    /// Copy every line to `sink` until one contains `needle`, inclusive
    pub fn stream_until(&mut self, needle: &str, sink: &mut dyn Write) -> Result<()> {
        let mut idle = 0;
        loop {
            let Some(line) = self.read_line()? else {
                idle += 1;
                if self.execution_idle_limit.is_some_and(|limit| idle >= limit) {
                    bail!("Timed out waiting for '{needle}'");
                }
                continue;
            };
            idle = 0;
            sink.write_all(line.as_bytes())
                .context("Failed to write trace output")?;
            if line.contains(needle) {
                sink.flush().context("Failed to write trace output")?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePort;

    #[test]
    fn test_read_line_returns_partial_prompt() {
        let mut session = DriverSession::new(FakePort::with_replies("hello\r\ntd>"));
        assert_eq!(session.read_line().unwrap().as_deref(), Some("hello\r\n"));
        assert_eq!(session.read_line().unwrap().as_deref(), Some("td>"));
        assert_eq!(session.read_line().unwrap(), None);
    }

    #[test]
    fn test_wait_for_times_out() {
        let mut session =
            DriverSession::new(FakePort::with_replies("noise\n")).with_idle_limits(3, Some(3));
        let err = session.wait_for("td>").unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn test_wait_for_aborts_on_refusal() {
        let mut session = DriverSession::new(FakePort::with_replies(
            "Enter Firmware 9 File Length: Limit reached. FIRMWARE_MAX_COUNT = 8\ntd>",
        ));
        let err = session.wait_for("Transfer").unwrap_err();
        assert!(err.to_string().contains("Limit reached"));
    }

    #[test]
    fn test_stream_until_copies_lines() {
        let mut session = DriverSession::new(FakePort::with_replies(
            "TD: start\nUUT< OK\nTest Execution Finished\ntd>",
        ))
        .with_idle_limits(3, Some(3));
        let mut sink: Vec<u8> = Vec::new();
        session.stream_until("Execution Finished", &mut sink).unwrap();
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "TD: start\nUUT< OK\nTest Execution Finished\n"
        );
    }

    #[test]
    fn test_send_file_data_in_blocks() {
        let mut session = DriverSession::new(FakePort::default());
        let data = vec![0x5a; BLOCK_SIZE * 2 + 3];
        session.send_file_data(&data).unwrap();
        assert_eq!(session.port().written(), &data[..]);
        assert_eq!(session.port().write_calls(), 3);
    }
}
