//! Script execution lifecycle
//!
//! Stages run strictly in order: parser init, executor init, tracer init,
//! wrapping of a direct command, parse, run. Whatever happens, teardown
//! destroys the stages that were initialized, tracer first and parser last,
//! and the session is marked for reboot.

extern crate alloc;

use alloc::vec::Vec;
use td_model::protocol::{BAD_COMMAND, EXECUTION_FINISHED};
use td_model::{ScriptBuffer, ScriptFailure, ShellError, Stage};
use td_shared::pipeline::TracerParams;

use super::Shell;
use super::ingest::allocate;
use super::wrap::wrap_direct_command;

pub const DPRAM_TEST_SCRIPT: &str = "D>TST\n";
pub const DPRAM_NOP_SCRIPT: &str = "D>WM 0x20 1\nD>WM 0x21 0x1\nG>ST 0 0\n";
pub const MASTER_RESET_SCRIPT: &str = "G>MR\n";
pub const HARD_RESET_SCRIPT: &str = "G>HR\n";
/// Hardware line queries followed by the status, error and hardware register reads
pub const STATUS_SCRIPT: &str = concat!(
    "G<PS 1\nG<RD 1\nG<DN 1\nG<ER 0\nG<AL 1\n",
    "D<RM 0x23 1\n",
    "D<RM 0x25 1\n",
    "D<RM 0x29 1\n",
);

pub(super) const NO_SCRIPT: &str = "No test case data file. First transfer test case data file\n";

/// Stages brought up so far
#[derive(Debug, Default, Clone, Copy)]
struct Initialized {
    parser: bool,
    executor: bool,
    tracer: bool,
}

impl Shell<'_> {
    /// Replace the pending script with `body` as a direct command and run it
    ///
    /// A reboot is requested whether or not the command could be stored.
    pub(super) fn submit_direct(&mut self, body: &[u8]) -> Result<(), ShellError> {
        let bytes = allocate(body.len()).map(|mut bytes| {
            bytes.copy_from_slice(body);
            bytes
        });
        self.submit_direct_bytes(bytes)
    }

    fn submit_direct_bytes(
        &mut self,
        bytes: Result<Vec<u8>, ShellError>,
    ) -> Result<(), ShellError> {
        match bytes {
            Ok(bytes) => {
                self.state.script = Some(ScriptBuffer::new(bytes));
                self.state.direct_command = true;
                self.execute()
            }
            Err(e) => {
                log::error!("direct command not stored: {e}");
                self.print("Error: failed to allocate memory\n");
                self.flush();
                self.state.reboot_requested = true;
                Err(e)
            }
        }
    }

    /// Run the pending script through the pipeline
    ///
    /// Always requests a reboot, also when there is nothing to run.
    pub(super) fn execute(&mut self) -> Result<(), ShellError> {
        if self.state.script.is_none() {
            self.print(NO_SCRIPT);
            self.state.reboot_requested = true;
            return Ok(());
        }

        let direct = self.state.direct_command;
        log::info!(
            "Executing {} script",
            if direct { "direct command" } else { "test data" }
        );

        let mut up = Initialized::default();
        let result = self.run_stages(&mut up);
        self.teardown(up);

        if !direct {
            self.print(EXECUTION_FINISHED);
            self.print("\n*\n*\n*\n*\n");
        }
        self.flush();

        self.state.reboot_requested = true;
        result
    }

    fn run_stages(&mut self, up: &mut Initialized) -> Result<(), ShellError> {
        let direct = self.state.direct_command;
        let start_time_ms = self.system.time().now_ms();

        if let Err(e) = self.pipeline.parser.init() {
            return Err(self.init_failed(Stage::Parser, &e));
        }
        up.parser = true;

        if let Err(e) = self.pipeline.executor.init() {
            return Err(self.init_failed(Stage::Executor, &e));
        }
        up.executor = true;

        let params = TracerParams {
            autoflush: true,
            buffer_size: self.config.trace_buffer_size,
            start_time_ms,
            suppress_timestamps: self.state.suppress_timestamps,
            direct_command: direct,
        };
        if let Err(e) = self.pipeline.tracer.init(params, &mut *self.system) {
            return Err(self.init_failed(Stage::Tracer, &e));
        }
        up.tracer = true;

        if direct {
            if let Some(line) = self.state.script.take() {
                match wrap_direct_command(line.as_bytes(), self.config.mini_script_timeout) {
                    Ok(wrapped) => self.state.script = Some(wrapped),
                    Err(e) => {
                        self.print("Error: failed to allocate memory\n");
                        return Err(e);
                    }
                }
            }
        }

        // The parser owns the script from here on
        let Some(script) = self.state.script.take() else {
            self.print(NO_SCRIPT);
            return Ok(());
        };
        log::debug!("parse: {} bytes", script.len());
        if let Err(e) = self.pipeline.parser.parse(script, &mut *self.system) {
            log::warn!("parse failed: {e}");
            if direct {
                self.print(BAD_COMMAND);
                self.print("\n");
            } else {
                self.print("Parsing failed! FATAL ERROR!!!\n");
                self.pipeline.tracer.flush();
            }
            return Err(ShellError::ScriptFailure(ScriptFailure::Parse));
        }

        match self.pipeline.executor.run(&mut *self.system) {
            Ok(()) => {
                log::info!("Executor run succeeded");
                self.print("Executor run succeeded\n");
                self.pipeline.tracer.flush();
                Ok(())
            }
            Err(e) => {
                log::error!("Executor run failed: {e}");
                self.print("Executor Run failed! FATAL ERROR!!!\n");
                self.pipeline.tracer.flush();
                Err(ShellError::ScriptFailure(ScriptFailure::Run))
            }
        }
    }

    fn init_failed(&mut self, stage: Stage, err: &td_model::PipelineError) -> ShellError {
        log::error!("{} init failed: {err}", stage.name());
        self.print(stage.init_label());
        self.print(" failed! FATAL ERROR!!!\n");
        // Whatever was traced before the failure still goes out
        if stage != Stage::Tracer {
            self.pipeline.tracer.flush();
        }
        ShellError::StageInitFailure(stage)
    }

    /// The only place stages are destroyed
    fn teardown(&mut self, up: Initialized) {
        if up.tracer {
            self.pipeline.tracer.destroy();
        }
        if up.executor {
            self.pipeline.executor.destroy();
        }
        if up.parser {
            self.pipeline.parser.destroy();
        }
        log::debug!("teardown: {up:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BufferMemory;
    use crate::shell::{Pipeline, ShellConfig};
    use crate::transport::FakeStream;
    use td_model::{FirmwareRegistry, PipelineError, TransportError};
    use td_shared::memory::MemoryAccess;
    use td_shared::pipeline::{ScriptExecutor, ScriptParser, Tracer};
    use td_shared::system::System;
    use td_shared::time::TimeProvider;
    use td_shared::transport::UutLink;

    struct Idle;

    impl UutLink for Idle {
        fn write(&mut self, _data: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }

        fn drain(&mut self) -> Result<Vec<u8>, TransportError> {
            Ok(Vec::new())
        }
    }

    impl TimeProvider for Idle {
        fn now_ms(&self) -> u64 {
            0
        }
    }

    struct Board {
        firmware: FirmwareRegistry,
        idle: Idle,
        memory: BufferMemory,
    }

    impl System for Board {
        fn firmware(&self) -> &FirmwareRegistry {
            &self.firmware
        }

        fn firmware_mut(&mut self) -> &mut FirmwareRegistry {
            &mut self.firmware
        }

        fn uut_link(&mut self) -> &mut dyn UutLink {
            &mut self.idle
        }

        fn memory(&mut self) -> &mut dyn MemoryAccess {
            &mut self.memory
        }

        fn time(&self) -> &dyn TimeProvider {
            &self.idle
        }

        fn set_debug_mode(&mut self, _on: bool) {}

        fn set_print_hardware_lines(&mut self, _on: bool) {}

        fn spawn_system_shell(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Counts init calls for all three stages
    #[derive(Default)]
    struct Stages {
        inits: usize,
    }

    impl ScriptParser for Stages {
        fn init(&mut self) -> Result<(), PipelineError> {
            self.inits += 1;
            Ok(())
        }

        fn parse(
            &mut self,
            _script: ScriptBuffer,
            _system: &mut dyn System,
        ) -> Result<(), PipelineError> {
            Ok(())
        }

        fn destroy(&mut self) {}
    }

    impl ScriptExecutor for Stages {
        fn init(&mut self) -> Result<(), PipelineError> {
            self.inits += 1;
            Ok(())
        }

        fn run(&mut self, _system: &mut dyn System) -> Result<(), PipelineError> {
            Ok(())
        }

        fn destroy(&mut self) {}
    }

    impl Tracer for Stages {
        fn init(
            &mut self,
            _params: TracerParams,
            _system: &mut dyn System,
        ) -> Result<(), PipelineError> {
            self.inits += 1;
            Ok(())
        }

        fn flush(&mut self) {}

        fn destroy(&mut self) {}
    }

    fn board() -> Board {
        Board {
            firmware: FirmwareRegistry::new(),
            idle: Idle,
            memory: BufferMemory::new(0, 16),
        }
    }

    #[test_log::test]
    fn test_unstored_direct_command_still_requests_reboot() {
        let mut stream = FakeStream::new();
        let mut system = board();
        let (mut parser, mut executor, mut tracer) =
            (Stages::default(), Stages::default(), Stages::default());
        let mut shell = Shell::new(
            ShellConfig::default(),
            &mut stream,
            &mut system,
            Pipeline {
                parser: &mut parser,
                executor: &mut executor,
                tracer: &mut tracer,
            },
        );

        let result = shell.submit_direct_bytes(Err(ShellError::AllocationFailure { size: 8 }));

        assert_eq!(result, Err(ShellError::AllocationFailure { size: 8 }));
        assert!(shell.state().reboot_requested);
        assert!(shell.state().script.is_none());
        drop(shell);
        assert_eq!(parser.inits + executor.inits + tracer.inits, 0);
        assert_eq!(stream.output_text(), "Error: failed to allocate memory\n");
    }

    #[test_log::test]
    fn test_direct_command_runs_and_requests_reboot() {
        let mut stream = FakeStream::new();
        let mut system = board();
        let (mut parser, mut executor, mut tracer) =
            (Stages::default(), Stages::default(), Stages::default());
        let mut shell = Shell::new(
            ShellConfig::default(),
            &mut stream,
            &mut system,
            Pipeline {
                parser: &mut parser,
                executor: &mut executor,
                tracer: &mut tracer,
            },
        );

        let result = shell.submit_direct_bytes(Ok(b"G>MR\n".to_vec()));

        assert_eq!(result, Ok(()));
        assert!(shell.state().reboot_requested);
        drop(shell);
        assert_eq!(parser.inits + executor.inits + tracer.inits, 3);
        assert!(stream.output_text().contains("Executor run succeeded"));
    }
}
