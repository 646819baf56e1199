//! In-memory serial port for tests

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};

/// Port that replays canned shell output and records what the client sent
///
/// Reads time out once the canned output is used up.
#[derive(Default)]
pub struct FakePort {
    input: VecDeque<u8>,
    written: Vec<u8>,
    write_calls: usize,
}

impl FakePort {
    pub fn with_replies(replies: &str) -> Self {
        Self {
            input: replies.bytes().collect(),
            ..Self::default()
        }
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }
}

impl Read for FakePort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.input.is_empty() {
            return Err(io::Error::new(ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.input.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for FakePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        self.write_calls += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
