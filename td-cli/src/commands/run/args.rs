use std::path::PathBuf;

use clap::Args;

use crate::session::DEFAULT_BAUD_RATE;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Serial port of the Test Driver console
    pub port: String,

    /// Test data file to upload and run
    pub file: PathBuf,

    /// Write the trace output here instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Switch the Test Driver into debug mode first
    #[arg(long)]
    pub debug_mode: bool,

    /// Turn off timestamps on the trace output
    #[arg(long)]
    pub timestamps_off: bool,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}
