mod args;

pub use args::RunArgs;

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use anyhow::{Context, Result, bail};
use regex::Regex;
use td_model::protocol::{
    CMD_DEBUG_MODE, CMD_RUN, CMD_TIMESTAMPS, CMD_UPLOAD_FIRMWARE, CMD_UPLOAD_TESTDATA,
    EXECUTION_FINISHED, FILE_LOADED,
};

use crate::commands::ping::verify_alive;
use crate::report::{Summary, print_summary};
use crate::session::{DriverSession, open_port};
use crate::testdata::{TestData, read_upload_file};

/// Optional shell settings applied before the uploads
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub debug_mode: bool,
    pub timestamps_off: bool,
}

pub fn handle_run(args: RunArgs) -> Result<()> {
    let testdata = TestData::load(&args.file)?;
    let mut sink: Box<dyn Write> = match &args.log_file {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create log file {}", path.display())
        })?)),
        None => Box::new(io::stdout()),
    };

    let port = open_port(&args.port, args.baud)?;
    let mut session = DriverSession::new(port);
    let options = RunOptions {
        debug_mode: args.debug_mode,
        timestamps_off: args.timestamps_off,
    };

    writeln!(sink, "======== PC-TO-TestDriver-Start ========")?;
    run_test(&mut session, &testdata, options, sink.as_mut())?;
    writeln!(sink, "======== PC-TO-TestDriver-End ========")?;
    sink.flush()?;

    print_summary(&Summary::TestFinished {
        port: &args.port,
        testdata: &args.file,
        firmware: testdata.firmware.len(),
        trace: args.log_file.as_deref(),
    });
    Ok(())
}

/// Upload everything `testdata` needs, run it and copy the trace to `sink`
pub fn run_test<P: Read + Write>(
    session: &mut DriverSession<P>,
    testdata: &TestData,
    options: RunOptions,
    sink: &mut dyn Write,
) -> Result<()> {
    verify_alive(session)?;

    if options.debug_mode {
        set_flag(session, CMD_DEBUG_MODE)?;
    }
    if options.timestamps_off {
        set_flag(session, CMD_TIMESTAMPS)?;
    }

    for firmware in &testdata.firmware {
        let data = read_upload_file(&firmware.path, "Firmware")?;
        log::info!(
            "Uploading firmware {} from {} ({} bytes)",
            firmware.number,
            firmware.path.display(),
            data.len()
        );
        upload_firmware(session, firmware.number, &data)?;
    }

    log::info!(
        "Uploading test data {} ({} bytes)",
        testdata.path.display(),
        testdata.bytes.len()
    );
    upload_testdata(session, &testdata.bytes)?;

    log::info!("Running test");
    session.send(&format!("{CMD_RUN}\n"))?;
    session.stream_until(EXECUTION_FINISHED, sink)
}

/// Send a `td ...` toggle command answered with `1`
fn set_flag<P: Read + Write>(session: &mut DriverSession<P>, command: &str) -> Result<()> {
    session.send(&format!("{command}\n"))?;
    session.send("1\n\n")?;
    session.wait_for_prompt()
}

fn upload_firmware<P: Read + Write>(
    session: &mut DriverSession<P>,
    number: usize,
    data: &[u8],
) -> Result<()> {
    let pattern = Regex::new(r"Transfer Firmware (\d+) in Binary \((\d+) bytes\)")
        .context("Invalid transfer pattern")?;

    session.send(&format!("{CMD_UPLOAD_FIRMWARE}\n"))?;
    session.send(&format!("{}\n", data.len()))?;
    session.wait_until("firmware transfer request", |_, line| {
        let Some(caps) = pattern.captures(line) else {
            return Ok(false);
        };
        let slot: usize = caps[1].parse().context("Bad firmware number")?;
        let len: usize = caps[2].parse().context("Bad firmware length")?;
        if slot != number {
            bail!(
                "Expected firmware file number {number}, Test Driver wants {slot}; \
                 try resetting the Test Driver"
            );
        }
        if len != data.len() {
            bail!("Expected firmware file length {}, Test Driver wants {len}", data.len());
        }
        Ok(true)
    })?;

    session.send_file_data(data)?;
    session.wait_for(FILE_LOADED)?;
    Ok(())
}

fn upload_testdata<P: Read + Write>(session: &mut DriverSession<P>, data: &[u8]) -> Result<()> {
    let pattern = Regex::new(r"Transfer Test Data File in Binary \((\d+) bytes\)")
        .context("Invalid transfer pattern")?;

    session.send(&format!("{CMD_UPLOAD_TESTDATA}\n"))?;
    session.send(&format!("{}\n", data.len()))?;
    session.wait_until("test data transfer request", |_, line| {
        let Some(caps) = pattern.captures(line) else {
            return Ok(false);
        };
        let len: usize = caps[1].parse().context("Bad test data length")?;
        if len != data.len() {
            bail!("Expected test data file length {}, Test Driver wants {len}", data.len());
        }
        Ok(true)
    })?;

    session.send_file_data(data)?;
    session.wait_for(FILE_LOADED)?;
    Ok(())
}
