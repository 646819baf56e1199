//! Error types shared by the shell core, the host binary and the client

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// Error raised by a byte stream (operator terminal or UUT link)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer went away (EOF on the terminal, unplugged serial device)
    ConnectionLost,
    /// Switching between line and raw mode failed
    Mode(String),
    /// Any other I/O failure
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionLost => write!(f, "Connection lost"),
            TransportError::Mode(msg) => write!(f, "Stream mode error: {msg}"),
            TransportError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

/// Error raised by a memory access capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Address is not a multiple of the access width
    Misaligned { addr: u64, width: usize },
    /// Address range is not backed by any accessible window
    OutOfBounds { addr: u64, width: usize },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::Misaligned { addr, width } => {
                write!(f, "Address 0x{addr:08x} is not aligned for {width}-byte access")
            }
            MemoryError::OutOfBounds { addr, width } => {
                write!(f, "Address 0x{addr:08x} ({width} bytes) is outside accessible memory")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MemoryError {}

/// Failure reported by an external pipeline stage (parser, executor, tracer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub message: String,
}

impl PipelineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PipelineError {}

/// Pipeline stage whose initialization failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parser,
    Executor,
    Tracer,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Parser => "Parser",
            Stage::Executor => "Executor",
            Stage::Tracer => "Tracer",
        }
    }

    /// Name of the stage's init call in operator messages
    pub fn init_label(self) -> &'static str {
        match self {
            Stage::Parser => "Parser_Init",
            Stage::Executor => "Executor_Init",
            Stage::Tracer => "Tracer_init",
        }
    }
}

/// Which half of a script run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFailure {
    Parse,
    Run,
}

/// Error type for shell operations
///
/// Every variant is recovered at the handler or lifecycle boundary and
/// reported to the operator; none of them end the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// A buffer or slot could not be allocated
    AllocationFailure { size: usize },
    /// All firmware slots are in use
    CapacityExceeded { max: usize },
    /// The binary ingestion protocol could not fill its buffer
    TransferFailure(TransportError),
    /// A pipeline stage failed to initialize
    StageInitFailure(Stage),
    /// The script failed to parse or to run
    ScriptFailure(ScriptFailure),
    /// Memory peek/poke/dump failed
    Memory(MemoryError),
    /// Operator input could not be used (bad token count, bad number, bad width)
    InvalidArgument(String),
    /// The operator terminal failed outside of a binary transfer
    Transport(TransportError),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::AllocationFailure { size } => {
                write!(f, "Failed to allocate memory size = {size}")
            }
            ShellError::CapacityExceeded { max } => {
                write!(f, "Limit reached. FIRMWARE_MAX_COUNT = {max}")
            }
            ShellError::TransferFailure(err) => write!(f, "Download failed: {err}"),
            ShellError::StageInitFailure(stage) => write!(f, "{} init failed", stage.name()),
            ShellError::ScriptFailure(ScriptFailure::Parse) => write!(f, "Parsing failed"),
            ShellError::ScriptFailure(ScriptFailure::Run) => write!(f, "Executor run failed"),
            ShellError::Memory(err) => write!(f, "{err}"),
            ShellError::InvalidArgument(msg) => write!(f, "{msg}"),
            ShellError::Transport(err) => write!(f, "{err}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ShellError {}

impl From<MemoryError> for ShellError {
    fn from(err: MemoryError) -> Self {
        ShellError::Memory(err)
    }
}

impl From<TransportError> for ShellError {
    fn from(err: TransportError) -> Self {
        ShellError::Transport(err)
    }
}
