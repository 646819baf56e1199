use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use td_cli::commands::ping::{PingArgs, handle_ping};
use td_cli::commands::run::{RunArgs, handle_run};
use td_cli::report::print_failure;

#[derive(Parser)]
#[command(name = "td-cli")]
#[command(about = "Upload and run tests on the Test Driver", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the Test Driver shell answers
    Ping(PingArgs),
    /// Upload a test data file with its firmware and run it
    Run(RunArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Ping(args) => handle_ping(args),
        Commands::Run(args) => handle_run(args),
    };

    if let Err(e) = result {
        print_failure(&e);
        std::process::exit(1);
    }
    Ok(())
}
