//! `td-shell`: the Test Driver operator shell
//!
//! Reads commands from the controlling terminal (or the serial console it is
//! started on), drives the UUT link and runs uploaded scripts through the
//! line-forwarding pipeline.

mod config;
mod memory;
mod pipeline;
mod system;
mod terminal;
mod uut;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use fw_core::{SessionEnd, Shell};

use crate::config::HostConfig;
use crate::memory::MappedMemory;
use crate::pipeline::HostPipeline;
use crate::system::HostSystem;
use crate::terminal::TerminalStream;
use crate::uut::SerialUutLink;

/// Test Driver operator shell
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device of the unit under test
    #[arg(long)]
    uut: Option<String>,

    /// Baud rate of the UUT link
    #[arg(long)]
    uut_baud: Option<u32>,

    /// Start with debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    let mut config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    config.apply_overrides(args.uut.clone(), args.uut_baud);

    // Leaving the shell as init, or directly under it, would take the console down
    // SAFETY: getpid and getppid have no preconditions
    let (pid, ppid) = unsafe { (libc::getpid(), libc::getppid()) };
    if pid == 1 || ppid == 1 {
        log::info!("Running as init (pid {pid}, ppid {ppid}), exit disabled");
        config.shell.allow_exit = false;
    }

    terminal::install_interrupt_handler().context("Failed to install SIGINT handler")?;

    let uut = SerialUutLink::open(&config.uut)?;
    let memory = MappedMemory::open(&config.memory_windows)?;
    let mut system = HostSystem::new(uut, memory);
    let mut stages = HostPipeline::new(config.executor.default_step_timeout_ms);
    let mut stream = TerminalStream::new();

    loop {
        let end = {
            let mut shell = Shell::new(
                config.shell.clone(),
                &mut stream,
                &mut system,
                stages.pipeline(),
            );
            shell.run(terminal::interrupt_flag())
        };

        match end {
            SessionEnd::Exit | SessionEnd::Disconnected => break,
            SessionEnd::Reboot => log::info!("Restarting shell session"),
            SessionEnd::Interrupted if config.shell.allow_exit => break,
            SessionEnd::Interrupted => log::info!("Interrupted, restarting shell session"),
        }
    }

    log::info!("td-shell exiting");
    Ok(())
}
