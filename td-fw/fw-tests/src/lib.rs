//! Shell session test harness
//!
//! Recording pipeline stages and an in-memory system object, so whole shell
//! sessions can be driven from a [`FakeStream`] and checked afterwards.

pub mod pipeline;
pub mod system;

use core::sync::atomic::AtomicBool;

use fw_core::{FakeStream, SessionEnd, Shell, ShellConfig, ShellState};

pub use pipeline::{Call, Failures, RecordingStages};
pub use system::{FakeUutLink, FixedTime, TestSystem};

/// Result of one session
#[derive(Debug)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    pub state: ShellState,
}

/// Everything a shell session runs against
pub struct Session {
    pub config: ShellConfig,
    pub stream: FakeStream,
    pub system: TestSystem,
    pub stages: RecordingStages,
}

impl Session {
    pub fn new() -> Self {
        Self {
            config: ShellConfig::default(),
            stream: FakeStream::new(),
            system: TestSystem::new(),
            stages: RecordingStages::new(),
        }
    }

    /// Session whose pipeline stages fail as configured
    pub fn failing(failures: Failures) -> Self {
        Self {
            stages: RecordingStages::failing(failures),
            ..Self::new()
        }
    }

    /// Queue operator input lines
    pub fn lines(&mut self, lines: &[&str]) -> &mut Self {
        for line in lines {
            self.stream.queue_line(line);
        }
        self
    }

    pub fn run(&mut self) -> SessionOutcome {
        self.run_with_interrupt(&AtomicBool::new(false))
    }

    pub fn run_with_interrupt(&mut self, interrupt: &AtomicBool) -> SessionOutcome {
        let mut shell = Shell::new(
            self.config.clone(),
            &mut self.stream,
            &mut self.system,
            self.stages.pipeline(),
        );
        let end = shell.run(interrupt);
        SessionOutcome {
            end,
            state: shell.into_state(),
        }
    }

    /// Everything the shell printed
    pub fn output(&self) -> String {
        self.stream.output_text()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
