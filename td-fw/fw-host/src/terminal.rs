//! Operator terminal on stdin/stdout
//!
//! Line mode is the terminal's normal canonical mode. Raw mode is set with
//! termios for binary uploads and the saved settings are put back when the
//! shell switches back. When stdin is not a terminal (a pipe in tests or a
//! socket bridge) the mode switch only changes bookkeeping.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use td_model::TransportError;
use td_shared::transport::{ShellStream, StreamMode};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT to the flag returned by [`interrupt_flag`]
///
/// The handler only sets the flag; the shell looks at it after the next
/// line arrives.
pub fn install_interrupt_handler() -> io::Result<()> {
    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn interrupt_flag() -> &'static AtomicBool {
    &INTERRUPTED
}

fn io_error(err: io::Error) -> TransportError {
    TransportError::Io(err.to_string())
}

pub struct TerminalStream {
    mode: StreamMode,
    /// Settings to restore when leaving raw mode
    saved: Option<libc::termios>,
}

impl TerminalStream {
    pub fn new() -> Self {
        Self {
            mode: StreamMode::Line,
            saved: None,
        }
    }

    fn enter_raw(&mut self) -> Result<(), TransportError> {
        if !io::stdin().is_terminal() {
            return Ok(());
        }
        // SAFETY: termios is plain old data; tcgetattr fills it in
        let mut settings: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut settings) } != 0 {
            return Err(TransportError::Mode(io::Error::last_os_error().to_string()));
        }
        let saved = settings;
        unsafe { libc::cfmakeraw(&mut settings) };
        // Block until at least one byte is available
        settings.c_cc[libc::VMIN] = 1;
        settings.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &settings) } != 0 {
            return Err(TransportError::Mode(io::Error::last_os_error().to_string()));
        }
        self.saved = Some(saved);
        Ok(())
    }

    fn leave_raw(&mut self) -> Result<(), TransportError> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &saved) } != 0 {
            self.saved = Some(saved);
            return Err(TransportError::Mode(io::Error::last_os_error().to_string()));
        }
        Ok(())
    }
}

impl Default for TerminalStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellStream for TerminalStream {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut line = Vec::new();
        let n = io::stdin()
            .lock()
            .read_until(b'\n', &mut line)
            .map_err(io_error)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        match io::stdin().lock().read(buf) {
            // Blocking read returning nothing means end of input
            Ok(0) => Err(TransportError::ConnectionLost),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(io_error(e)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        io::stdout().lock().write_all(data).map_err(io_error)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        io::stdout().lock().flush().map_err(io_error)
    }

    fn mode(&self) -> StreamMode {
        self.mode
    }

    fn set_mode(&mut self, mode: StreamMode) -> Result<(), TransportError> {
        if mode == self.mode {
            return Ok(());
        }
        match mode {
            StreamMode::Raw => self.enter_raw()?,
            StreamMode::Line => self.leave_raw()?,
        }
        log::trace!("terminal: {:?} -> {mode:?}", self.mode);
        self.mode = mode;
        Ok(())
    }
}

impl Drop for TerminalStream {
    fn drop(&mut self) {
        if let Err(e) = self.leave_raw() {
            log::error!("Failed to restore terminal settings: {e}");
        }
    }
}
