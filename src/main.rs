//! API harness - sequential integration tests for remote HTTP APIs
//!
//! Runs a scenario of checks against a target, prints a per-check line
//! and a summary, and exits 0 only when every check passed.

use clap::Parser;
use harness::commands::Commands;
use harness::{cli, common::logging};

#[derive(Parser)]
#[command(name = "api-harness", about = "Sequential integration-test harness for HTTP APIs")]
#[command(version, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
