//! Fake operator stream for testing
//!
//! Plays back queued input lines and raw chunks and records everything the
//! shell writes. Mode switches are tracked so tests can check that raw mode
//! never leaks out of a binary transfer.

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use td_model::TransportError;
use td_shared::transport::{ShellStream, StreamMode};

/// One scripted piece of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Line(String),
    /// Bytes handed out by raw reads, at most `chunk` per call
    Raw { data: Vec<u8>, chunk: usize },
    /// One raw read returning zero bytes
    Empty,
    /// One read failing with the given error
    Fail(TransportError),
}

/// Scripted [`ShellStream`]
///
/// - `read_line()` returns queued lines, then `Ok(None)`
/// - `read()` hands out queued raw bytes in the configured chunk sizes
/// - `write()` appends to an output buffer readable with [`FakeStream::output`]
pub struct FakeStream {
    input: VecDeque<Input>,
    output: Vec<u8>,
    mode: StreamMode,
    mode_changes: Vec<StreamMode>,
    fail_set_mode: bool,
}

impl FakeStream {
    pub fn new() -> Self {
        Self {
            input: VecDeque::new(),
            output: Vec::new(),
            mode: StreamMode::Line,
            mode_changes: Vec::new(),
            fail_set_mode: false,
        }
    }

    /// Queue a line of operator input; a `\n` is appended if missing
    pub fn queue_line(&mut self, line: &str) -> &mut Self {
        let mut line = line.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.input.push_back(Input::Line(line));
        self
    }

    /// Queue raw bytes delivered in reads of at most `chunk` bytes
    pub fn queue_raw(&mut self, data: &[u8], chunk: usize) -> &mut Self {
        self.input.push_back(Input::Raw {
            data: data.to_vec(),
            chunk: chunk.max(1),
        });
        self
    }

    /// Queue one raw read that returns zero bytes
    pub fn queue_empty_read(&mut self) -> &mut Self {
        self.input.push_back(Input::Empty);
        self
    }

    /// Queue one failing read
    pub fn queue_failure(&mut self, err: TransportError) -> &mut Self {
        self.input.push_back(Input::Fail(err));
        self
    }

    /// Make every `set_mode()` call fail
    pub fn fail_set_mode(&mut self, fail: bool) {
        self.fail_set_mode = fail;
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Everything written so far, lossily decoded
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Every mode passed to `set_mode()`, in order
    pub fn mode_changes(&self) -> &[StreamMode] {
        &self.mode_changes
    }

    /// Input not consumed yet
    pub fn pending_inputs(&self) -> usize {
        self.input.len()
    }
}

impl Default for FakeStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellStream for FakeStream {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        match self.input.pop_front() {
            None => Ok(None),
            Some(Input::Line(line)) => Ok(Some(line)),
            Some(Input::Fail(err)) => Err(err),
            Some(Input::Empty) => Ok(Some(String::new())),
            Some(Input::Raw { data, .. }) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.input.pop_front() {
            None => Err(TransportError::ConnectionLost),
            Some(Input::Raw { mut data, chunk }) => {
                let n = buf.len().min(chunk).min(data.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    data.drain(..n);
                    self.input.push_front(Input::Raw { data, chunk });
                }
                Ok(n)
            }
            Some(Input::Line(line)) => {
                let bytes = line.as_bytes();
                let n = buf.len().min(bytes.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.input.push_front(Input::Raw {
                        data: bytes[n..].to_vec(),
                        chunk: usize::MAX,
                    });
                }
                Ok(n)
            }
            Some(Input::Empty) => Ok(0),
            Some(Input::Fail(err)) => Err(err),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.output.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn mode(&self) -> StreamMode {
        self.mode
    }

    fn set_mode(&mut self, mode: StreamMode) -> Result<(), TransportError> {
        if self.fail_set_mode {
            return Err(TransportError::Mode("set_mode disabled".to_string()));
        }
        self.mode = mode;
        self.mode_changes.push(mode);
        Ok(())
    }
}
