//! Line-forwarding script pipeline
//!
//! A script is a list of channel-prefixed steps (`D>WM 0x20 1`, `G<RD 1`)
//! grouped into test cases with `T>` directives:
//!
//! ```text
//! T>BEGIN <id>
//! <steps>
//! T>END <id>
//! T>EX <id> <repeat> <stop_on_failure> <timeout_ms> <flush_on_end>
//! ```
//!
//! Steps outside a test case run once, in place. `>` steps are commands sent
//! to the UUT, `<` steps are queries that wait for one reply line.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use fw_core::{Pipeline, VERSION};
use td_model::{PipelineError, ScriptBuffer};
use td_shared::pipeline::{ScriptExecutor, ScriptParser, Tracer, TracerParams};
use td_shared::system::System;

/// One line sent to the UUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub text: String,
    /// `<` step: wait for a reply line
    pub query: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: u32,
    pub steps: Vec<Step>,
}

/// Execution of one test case, from a `T>EX` directive or an implicit top-level step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub case: usize,
    pub repeat: u32,
    pub stop_on_failure: bool,
    pub timeout_ms: u64,
    pub flush_on_end: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub cases: Vec<TestCase>,
    pub executions: Vec<Execution>,
}

fn parse_error(line_no: usize, msg: impl std::fmt::Display) -> PipelineError {
    PipelineError::new(format!("line {line_no}: {msg}"))
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    line_no: usize,
) -> Result<T, PipelineError> {
    fields
        .get(index)
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| parse_error(line_no, format!("missing or bad field {index}")))
}

/// Parse script text into a [`Program`]
pub fn parse_program(text: &str, default_timeout_ms: u64) -> Result<Program, PipelineError> {
    let mut program = Program::default();
    let mut open: Option<TestCase> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        if let Some(directive) = line.strip_prefix("T>") {
            let fields: Vec<&str> = directive.split_whitespace().collect();
            match fields.first().copied() {
                Some("BEGIN") => {
                    if open.is_some() {
                        return Err(parse_error(line_no, "nested T>BEGIN"));
                    }
                    let id = parse_field(&fields, 1, line_no)?;
                    open = Some(TestCase {
                        id,
                        steps: Vec::new(),
                    });
                }
                Some("END") => {
                    let id: u32 = parse_field(&fields, 1, line_no)?;
                    match open.take() {
                        Some(case) if case.id == id => program.cases.push(case),
                        _ => {
                            return Err(parse_error(
                                line_no,
                                format!("T>END {id} without T>BEGIN"),
                            ));
                        }
                    }
                }
                Some("EX") => {
                    let id: u32 = parse_field(&fields, 1, line_no)?;
                    let case = program
                        .cases
                        .iter()
                        .position(|c| c.id == id)
                        .ok_or_else(|| parse_error(line_no, format!("unknown test case {id}")))?;
                    program.executions.push(Execution {
                        case,
                        repeat: parse_field(&fields, 2, line_no)?,
                        stop_on_failure: parse_field::<u32>(&fields, 3, line_no)? != 0,
                        timeout_ms: parse_field(&fields, 4, line_no)?,
                        flush_on_end: parse_field::<u32>(&fields, 5, line_no)? != 0,
                    });
                }
                _ => return Err(parse_error(line_no, format!("unknown directive '{line}'"))),
            }
            continue;
        }

        let step = parse_step(line)
            .ok_or_else(|| parse_error(line_no, format!("bad step '{line}'")))?;
        match open.as_mut() {
            Some(case) => case.steps.push(step),
            None => {
                program.cases.push(TestCase {
                    id: 0,
                    steps: vec![step],
                });
                program.executions.push(Execution {
                    case: program.cases.len() - 1,
                    repeat: 1,
                    stop_on_failure: true,
                    timeout_ms: default_timeout_ms,
                    flush_on_end: true,
                });
            }
        }
    }

    if let Some(case) = open {
        return Err(PipelineError::new(format!(
            "test case {} has no T>END",
            case.id
        )));
    }
    Ok(program)
}

/// `X>text` or `X<text` with an uppercase channel letter
fn parse_step(line: &str) -> Option<Step> {
    let mut chars = line.chars();
    let channel = chars.next()?;
    let direction = chars.next()?;
    if !channel.is_ascii_uppercase() {
        return None;
    }
    let query = match direction {
        '>' => false,
        '<' => true,
        _ => return None,
    };
    Some(Step {
        text: line.to_string(),
        query,
    })
}

/// Trace records shared by the executor and the tracer
#[derive(Debug, Default)]
pub struct TraceLog {
    active: bool,
    params: Option<TracerParams>,
    buffer: String,
}

impl TraceLog {
    fn record(&mut self, now_ms: u64, source: &str, text: &str) {
        if !self.active {
            return;
        }
        let Some(params) = self.params.as_ref() else {
            return;
        };
        let text = text.trim_end();
        if params.suppress_timestamps {
            self.buffer.push_str(&format!("{source} {text}\n"));
        } else {
            let elapsed = now_ms.saturating_sub(params.start_time_ms);
            self.buffer.push_str(&format!(
                "[{:>6}.{:03}] {source} {text}\n",
                elapsed / 1000,
                elapsed % 1000
            ));
        }
        if params.autoflush || self.buffer.len() >= params.buffer_size {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(self.buffer.as_bytes()).and_then(|()| out.flush()) {
            log::warn!("trace flush failed: {e}");
        }
        self.buffer.clear();
    }
}

type Shared<T> = Rc<RefCell<T>>;

pub struct LineParser {
    program: Shared<Option<Program>>,
    default_timeout_ms: u64,
}

impl ScriptParser for LineParser {
    fn init(&mut self) -> Result<(), PipelineError> {
        *self.program.borrow_mut() = None;
        Ok(())
    }

    fn parse(
        &mut self,
        script: ScriptBuffer,
        _system: &mut dyn System,
    ) -> Result<(), PipelineError> {
        let program = parse_program(&script.as_text(), self.default_timeout_ms)?;
        log::debug!(
            "parsed {} test cases, {} executions",
            program.cases.len(),
            program.executions.len()
        );
        *self.program.borrow_mut() = Some(program);
        Ok(())
    }

    fn destroy(&mut self) {
        *self.program.borrow_mut() = None;
    }
}

pub struct ForwardingExecutor {
    program: Shared<Option<Program>>,
    trace: Shared<TraceLog>,
}

impl ForwardingExecutor {
    fn trace(&self, system: &dyn System, source: &str, text: &str) {
        self.trace
            .borrow_mut()
            .record(system.time().now_ms(), source, text);
    }

    /// Wait for one reply line from the UUT
    fn await_reply(
        system: &mut dyn System,
        pending: &mut Vec<u8>,
        timeout_ms: u64,
    ) -> Result<Option<String>, PipelineError> {
        let start = system.time().now_ms();
        loop {
            if let Some(end) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=end).collect();
                return Ok(Some(String::from_utf8_lossy(&line).trim_end().to_string()));
            }
            if system.time().elapsed_ms(start) >= timeout_ms {
                return Ok(None);
            }
            let received = system
                .uut_link()
                .drain()
                .map_err(|e| PipelineError::new(format!("UUT link: {e}")))?;
            if received.is_empty() {
                std::thread::sleep(Duration::from_millis(2));
            }
            pending.extend_from_slice(&received);
        }
    }

    fn run_case(
        &self,
        system: &mut dyn System,
        case: &TestCase,
        execution: &Execution,
    ) -> Result<bool, PipelineError> {
        let mut pending = Vec::new();
        let mut passed = true;
        for step in &case.steps {
            self.trace(system, "TD>", &step.text);
            let mut line = step.text.clone();
            line.push('\r');
            system
                .uut_link()
                .write(line.as_bytes())
                .map_err(|e| PipelineError::new(format!("UUT link: {e}")))?;

            if step.query {
                match Self::await_reply(system, &mut pending, execution.timeout_ms)? {
                    Some(reply) if reply.starts_with("ERR") => {
                        self.trace(system, "UUT<", &reply);
                        passed = false;
                    }
                    Some(reply) => self.trace(system, "UUT<", &reply),
                    None => {
                        let message = format!("timeout waiting for reply to {}", step.text);
                        self.trace(system, "TD!", &message);
                        passed = false;
                    }
                }
                if !passed && execution.stop_on_failure {
                    break;
                }
            }
        }
        Ok(passed)
    }
}

impl ScriptExecutor for ForwardingExecutor {
    fn init(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }

    fn run(&mut self, system: &mut dyn System) -> Result<(), PipelineError> {
        let Some(program) = self.program.borrow_mut().take() else {
            return Err(PipelineError::new("nothing parsed"));
        };

        let mut failures = 0;
        for execution in &program.executions {
            let case = &program.cases[execution.case];
            for round in 0..execution.repeat.max(1) {
                let passed = self.run_case(system, case, execution)?;
                let verdict = if passed { "PASSED" } else { "FAILED" };
                let message = format!("Test case {} run {} {verdict}", case.id, round + 1);
                self.trace(system, "TD:", &message);
                if !passed {
                    failures += 1;
                    if execution.stop_on_failure {
                        break;
                    }
                }
            }
            if execution.flush_on_end {
                self.trace.borrow_mut().flush();
            }
        }

        if failures > 0 {
            Err(PipelineError::new(format!("{failures} test case runs failed")))
        } else {
            Ok(())
        }
    }

    fn destroy(&mut self) {
        *self.program.borrow_mut() = None;
    }
}

pub struct StdoutTracer {
    trace: Shared<TraceLog>,
}

impl Tracer for StdoutTracer {
    fn init(&mut self, params: TracerParams, system: &mut dyn System) -> Result<(), PipelineError> {
        let direct = params.direct_command;
        {
            let mut trace = self.trace.borrow_mut();
            trace.buffer = String::new();
            trace
                .buffer
                .try_reserve(params.buffer_size)
                .map_err(|_| PipelineError::new("trace buffer allocation failed"))?;
            trace.params = Some(params);
            trace.active = true;
        }
        if !direct {
            let now = system.time().now_ms();
            self.trace
                .borrow_mut()
                .record(now, "TD:", &format!("TestDriver_Init - Test Driver v{VERSION}"));
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.trace.borrow_mut().flush();
    }

    fn destroy(&mut self) {
        let mut trace = self.trace.borrow_mut();
        trace.flush();
        trace.active = false;
        trace.params = None;
        trace.buffer = String::new();
    }
}

/// Parser, executor and tracer wired to shared state
pub struct HostPipeline {
    parser: LineParser,
    executor: ForwardingExecutor,
    tracer: StdoutTracer,
}

impl HostPipeline {
    pub fn new(default_timeout_ms: u64) -> Self {
        let program: Shared<Option<Program>> = Rc::new(RefCell::new(None));
        let trace: Shared<TraceLog> = Rc::new(RefCell::new(TraceLog::default()));
        Self {
            parser: LineParser {
                program: program.clone(),
                default_timeout_ms,
            },
            executor: ForwardingExecutor {
                program,
                trace: trace.clone(),
            },
            tracer: StdoutTracer { trace },
        }
    }

    pub fn pipeline(&mut self) -> Pipeline<'_> {
        Pipeline {
            parser: &mut self.parser,
            executor: &mut self.executor,
            tracer: &mut self.tracer,
        }
    }
}
