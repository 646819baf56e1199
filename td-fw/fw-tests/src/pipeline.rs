//! Recording pipeline stages
//!
//! All three stages append to one shared call log so tests can check the
//! exact order of init, parse, run, flush and destroy calls.

use std::cell::RefCell;
use std::rc::Rc;

use fw_core::Pipeline;
use td_model::{PipelineError, ScriptBuffer};
use td_shared::pipeline::{ScriptExecutor, ScriptParser, Tracer, TracerParams};
use td_shared::system::System;

/// One pipeline call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ParserInit,
    ExecutorInit,
    TracerInit(TracerParams),
    /// Script text handed to the parser
    Parse(String),
    Run,
    TracerFlush,
    TracerDestroy,
    ExecutorDestroy,
    ParserDestroy,
}

/// Which stage operations fail
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub parser_init: bool,
    pub executor_init: bool,
    pub tracer_init: bool,
    pub parse: bool,
    pub run: bool,
}

type CallLog = Rc<RefCell<Vec<Call>>>;

fn fail_if(fail: bool, what: &str) -> Result<(), PipelineError> {
    if fail {
        Err(PipelineError::new(format!("{what} failed")))
    } else {
        Ok(())
    }
}

pub struct RecordingParser {
    log: CallLog,
    failures: Failures,
}

impl ScriptParser for RecordingParser {
    fn init(&mut self) -> Result<(), PipelineError> {
        self.log.borrow_mut().push(Call::ParserInit);
        fail_if(self.failures.parser_init, "parser init")
    }

    fn parse(
        &mut self,
        script: ScriptBuffer,
        _system: &mut dyn System,
    ) -> Result<(), PipelineError> {
        self.log
            .borrow_mut()
            .push(Call::Parse(script.as_text().into_owned()));
        fail_if(self.failures.parse, "parse")
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().push(Call::ParserDestroy);
    }
}

pub struct RecordingExecutor {
    log: CallLog,
    failures: Failures,
}

impl ScriptExecutor for RecordingExecutor {
    fn init(&mut self) -> Result<(), PipelineError> {
        self.log.borrow_mut().push(Call::ExecutorInit);
        fail_if(self.failures.executor_init, "executor init")
    }

    fn run(&mut self, _system: &mut dyn System) -> Result<(), PipelineError> {
        self.log.borrow_mut().push(Call::Run);
        fail_if(self.failures.run, "run")
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().push(Call::ExecutorDestroy);
    }
}

pub struct RecordingTracer {
    log: CallLog,
    failures: Failures,
}

impl Tracer for RecordingTracer {
    fn init(
        &mut self,
        params: TracerParams,
        _system: &mut dyn System,
    ) -> Result<(), PipelineError> {
        self.log.borrow_mut().push(Call::TracerInit(params));
        fail_if(self.failures.tracer_init, "tracer init")
    }

    fn flush(&mut self) {
        self.log.borrow_mut().push(Call::TracerFlush);
    }

    fn destroy(&mut self) {
        self.log.borrow_mut().push(Call::TracerDestroy);
    }
}

/// Parser, executor and tracer sharing one call log
pub struct RecordingStages {
    log: CallLog,
    parser: RecordingParser,
    executor: RecordingExecutor,
    tracer: RecordingTracer,
}

impl RecordingStages {
    pub fn new() -> Self {
        Self::failing(Failures::default())
    }

    pub fn failing(failures: Failures) -> Self {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        Self {
            parser: RecordingParser {
                log: log.clone(),
                failures,
            },
            executor: RecordingExecutor {
                log: log.clone(),
                failures,
            },
            tracer: RecordingTracer {
                log: log.clone(),
                failures,
            },
            log,
        }
    }

    pub fn pipeline(&mut self) -> Pipeline<'_> {
        Pipeline {
            parser: &mut self.parser,
            executor: &mut self.executor,
            tracer: &mut self.tracer,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// How many times `call` was made (tracer init matched by kind only)
    pub fn count(&self, call: &Call) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| match (c, call) {
                (Call::TracerInit(_), Call::TracerInit(_)) => true,
                (Call::Parse(_), Call::Parse(_)) => true,
                _ => *c == call,
            })
            .count()
    }

    /// Script texts the parser received
    pub fn parsed(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Parse(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn tracer_params(&self) -> Option<TracerParams> {
        self.log.borrow().iter().find_map(|c| match c {
            Call::TracerInit(params) => Some(params.clone()),
            _ => None,
        })
    }
}

impl Default for RecordingStages {
    fn default() -> Self {
        Self::new()
    }
}
