//! External script pipeline: parser, executor, tracer
//!
//! The shell never looks inside a script. It initializes the three stages in
//! order, hands the script buffer to the parser, runs the executor and tears
//! everything down again. What a "step" is belongs to the implementations.

use crate::system::System;
use td_model::{PipelineError, ScriptBuffer};

/// Settings passed to [`Tracer::init`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerParams {
    /// Flush after every trace record
    pub autoflush: bool,
    /// Trace buffer capacity in bytes
    pub buffer_size: usize,
    /// Reference time for relative timestamps
    pub start_time_ms: u64,
    /// Leave timestamps off trace lines
    pub suppress_timestamps: bool,
    /// The script is a single wrapped operator line
    pub direct_command: bool,
}

pub trait ScriptParser {
    fn init(&mut self) -> Result<(), PipelineError>;

    /// Parse `script` into whatever the executor runs
    ///
    /// Takes ownership of the buffer; the caller keeps no copy.
    fn parse(&mut self, script: ScriptBuffer, system: &mut dyn System)
    -> Result<(), PipelineError>;

    fn destroy(&mut self);
}

pub trait ScriptExecutor {
    fn init(&mut self) -> Result<(), PipelineError>;

    /// Run the previously parsed script against the UUT
    fn run(&mut self, system: &mut dyn System) -> Result<(), PipelineError>;

    fn destroy(&mut self);
}

pub trait Tracer {
    fn init(&mut self, params: TracerParams, system: &mut dyn System)
    -> Result<(), PipelineError>;

    fn flush(&mut self);

    fn destroy(&mut self);
}
