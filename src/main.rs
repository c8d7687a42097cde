//! gatecheck - browser scenarios for admin access control
//!
//! Runs declarative YAML scenarios through a WebDriver browser and checks that
//! admin pages are reachable for the owner and denied to everyone else.

use std::path::PathBuf;

use clap::Parser;
use gatecheck::cli::{self, GlobalOptions};
use gatecheck::commands::Commands;
use gatecheck::common::logging;

#[derive(Parser)]
#[command(name = "gatecheck", about = "End-to-end access control scenarios")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = logging::init_cli(cli.verbose, cli.log_file.as_deref());

    let global = GlobalOptions {
        config: cli.config,
        verbose: cli.verbose,
    };

    if let Err(e) = cli::dispatch(cli.command, &global).await {
        eprintln!("Error: {e}");
        drop(log_guard);
        std::process::exit(e.exit_code());
    }
}
