//! What the client tells the operator once a command is over
//!
//! The shell's own output goes to the trace sink; these are the client's
//! closing lines on stdout and stderr.

use std::fmt;
use std::io;
use std::path::Path;

/// Closing summary of a successful command
#[derive(Debug, Clone, Copy)]
pub enum Summary<'a> {
    Alive {
        port: &'a str,
        attempts: u32,
    },
    TestFinished {
        port: &'a str,
        testdata: &'a Path,
        firmware: usize,
        trace: Option<&'a Path>,
    },
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Summary::Alive { port, attempts } => {
                writeln!(f, "Test Driver on {port} answered after {attempts} attempt(s)")?;
                write!(f, "  next: td-cli run {port} <testdata.txt>")
            }
            Summary::TestFinished {
                port,
                testdata,
                firmware,
                trace,
            } => {
                write!(
                    f,
                    "{} ran on {port} with {firmware} firmware image(s)",
                    testdata.display()
                )?;
                match trace {
                    Some(path) => write!(f, "\n  trace: {}", path.display()),
                    None => Ok(()),
                }
            }
        }
    }
}

pub fn print_summary(summary: &Summary<'_>) {
    println!("{summary}");
}

/// Operator hints for a failed command, most specific cause first
pub fn failure_hints(err: &anyhow::Error) -> Vec<&'static str> {
    let mut hints = Vec::new();
    if err.chain().any(|cause| cause.is::<serialport::Error>()) {
        hints.push("Check the port name and that nothing else holds the port open");
    } else if err.chain().any(|cause| cause.is::<io::Error>()) {
        hints.push("Check the test data and firmware file paths");
    }
    if err.to_string().contains("not responding") {
        hints.push("Reset the Test Driver and wait for its shell prompt");
    }
    hints.push("td-cli ping <port>");
    hints
}

/// Print `err` with its causes and hints to stderr
pub fn print_failure(err: &anyhow::Error) {
    eprintln!("td-cli: {err:#}");
    for hint in failure_hints(err) {
        eprintln!("  {hint}");
    }
}
