//! Byte stream traits
//!
//! `ShellStream` is the operator side (a terminal or the PC client on a
//! serial line). It is normally line-buffered and echoed; binary uploads
//! switch it to raw mode for the duration of the transfer through
//! [`RawModeGuard`].
//!
//! `UutLink` is the serial line to the unit under test.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use td_model::TransportError;

/// Input discipline of the operator stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Line-buffered, echoed, line endings translated
    Line,
    /// Unbuffered, no echo, bytes passed through untouched
    Raw,
}

/// Operator-facing byte stream
pub trait ShellStream {
    /// Read one line including its terminator
    ///
    /// # Returns
    ///
    /// * `Ok(Some(line))` - a line (the last line of input may lack `\n`)
    /// * `Ok(None)` - end of input
    /// * `Err(TransportError)` - the stream failed
    fn read_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Read up to `buf.len()` bytes
    ///
    /// Returning fewer bytes than requested, including zero, is not an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Push buffered output to the peer
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Current input discipline
    fn mode(&self) -> StreamMode;

    /// Switch input discipline
    fn set_mode(&mut self, mode: StreamMode) -> Result<(), TransportError>;

    fn write_str(&mut self, text: &str) -> Result<(), TransportError> {
        self.write(text.as_bytes())
    }
}

/// Scoped raw mode on a [`ShellStream`]
///
/// Entering records the current mode and switches to raw; dropping the guard
/// puts the recorded mode back, on every exit path.
pub struct RawModeGuard<'a, S: ShellStream + ?Sized> {
    stream: &'a mut S,
    previous: StreamMode,
}

impl<'a, S: ShellStream + ?Sized> RawModeGuard<'a, S> {
    /// Switch `stream` to raw mode
    ///
    /// If the switch itself fails the stream is left as it was and no guard
    /// is returned.
    pub fn enter(stream: &'a mut S) -> Result<Self, TransportError> {
        let previous = stream.mode();
        stream.set_mode(StreamMode::Raw)?;
        log::trace!("RawModeGuard: entered raw mode (previous {previous:?})");
        Ok(Self { stream, previous })
    }
}

impl<S: ShellStream + ?Sized> Deref for RawModeGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stream
    }
}

impl<S: ShellStream + ?Sized> DerefMut for RawModeGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stream
    }
}

impl<S: ShellStream + ?Sized> Drop for RawModeGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.set_mode(self.previous) {
            log::error!("RawModeGuard: failed to restore {:?} mode: {e}", self.previous);
        } else {
            log::trace!("RawModeGuard: restored {:?} mode", self.previous);
        }
    }
}

/// Serial link to the unit under test
pub trait UutLink {
    /// Send bytes to the UUT
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Take everything the UUT has sent since the last drain (non-blocking)
    fn drain(&mut self) -> Result<Vec<u8>, TransportError>;
}
