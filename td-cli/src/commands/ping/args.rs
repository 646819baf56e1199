use clap::Args;

use crate::session::DEFAULT_BAUD_RATE;

#[derive(Debug, Args)]
pub struct PingArgs {
    /// Serial port of the Test Driver console
    pub port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}
