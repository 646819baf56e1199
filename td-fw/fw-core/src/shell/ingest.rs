//! Binary upload protocol
//!
//! The operator stream is line-buffered, but uploads arrive as an exact
//! number of raw bytes announced beforehand. The stream is switched to raw
//! mode for the transfer and switched back on every exit path.

extern crate alloc;

use alloc::vec::Vec;
use td_model::ShellError;
use td_shared::transport::{RawModeGuard, ShellStream};

/// Allocate a zeroed buffer of exactly `len` bytes, failing instead of aborting
pub fn allocate(len: usize) -> Result<Vec<u8>, ShellError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ShellError::AllocationFailure { size: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Fill `buf` completely from `stream` in raw mode
///
/// Short reads and zero-length reads are retried for the remaining count.
/// There is no timeout here; a stream error ends the transfer.
pub fn receive_into(stream: &mut dyn ShellStream, buf: &mut [u8]) -> Result<(), ShellError> {
    let mut raw = RawModeGuard::enter(stream).map_err(ShellError::TransferFailure)?;

    let mut offset = 0;
    while offset < buf.len() {
        match raw.read(&mut buf[offset..]) {
            Ok(n) => offset += n,
            Err(e) => {
                log::warn!("receive: transfer aborted at {offset}/{} bytes: {e}", buf.len());
                return Err(ShellError::TransferFailure(e));
            }
        }
    }

    log::debug!("receive: {} bytes", buf.len());
    Ok(())
}

/// Receive exactly `len` bytes
pub fn receive(stream: &mut dyn ShellStream, len: usize) -> Result<Vec<u8>, ShellError> {
    let mut buf = allocate(len)?;
    receive_into(stream, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FakeStream;
    use td_model::TransportError;
    use td_shared::transport::StreamMode;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test_log::test]
    fn test_receive_sizes_over_short_reads() {
        for len in [0usize, 1, 4096] {
            for chunk in [1usize, 3, 512, 5000] {
                let data = pattern(len);
                let mut stream = FakeStream::new();
                stream.queue_empty_read();
                stream.queue_raw(&data, chunk);

                let received = receive(&mut stream, len).unwrap();
                assert_eq!(received, data, "len={len} chunk={chunk}");
                assert_eq!(stream.mode(), StreamMode::Line);
                assert_eq!(stream.mode_changes(), &[StreamMode::Raw, StreamMode::Line]);
            }
        }
    }

    #[test_log::test]
    fn test_zero_length_reads_are_retried() {
        let mut stream = FakeStream::new();
        stream
            .queue_raw(b"ab", 1)
            .queue_empty_read()
            .queue_empty_read()
            .queue_raw(b"cd", 2);

        assert_eq!(receive(&mut stream, 4).unwrap(), b"abcd");
    }

    #[test_log::test]
    fn test_failing_read_restores_mode() {
        let mut stream = FakeStream::new();
        stream
            .queue_raw(b"abc", 2)
            .queue_failure(TransportError::Io("unplugged".into()));

        let result = receive(&mut stream, 10);
        assert_eq!(
            result,
            Err(ShellError::TransferFailure(TransportError::Io(
                "unplugged".into()
            )))
        );
        assert_eq!(stream.mode(), StreamMode::Line);
        assert_eq!(stream.mode_changes(), &[StreamMode::Raw, StreamMode::Line]);
    }

    #[test_log::test]
    fn test_mode_switch_failure_is_transfer_failure() {
        let mut stream = FakeStream::new();
        stream.fail_set_mode(true);
        stream.queue_raw(b"abc", 3);

        assert!(matches!(
            receive(&mut stream, 3),
            Err(ShellError::TransferFailure(TransportError::Mode(_)))
        ));
        // Nothing consumed
        assert_eq!(stream.pending_inputs(), 1);
    }

    #[test]
    fn test_allocate_exact() {
        let buf = allocate(17).unwrap();
        assert_eq!(buf.len(), 17);
        assert!(matches!(
            allocate(usize::MAX),
            Err(ShellError::AllocationFailure { size: usize::MAX })
        ));
    }
}
