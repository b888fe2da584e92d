//! pagecheck - declarative browser smoke suites
//!
//! Runs YAML suites of navigate/query/assert/click/scroll steps against a
//! page in headless Chromium, retrying each assertion within a bounded
//! polling window.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use pagecheck::{cli, commands, common};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "pagecheck", about = "Browser smoke suites with retrying assertions")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging and per-step details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write detailed logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    common::logging::init_cli(cli.verbose, cli.log_file.as_deref());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling run");
            on_signal.cancel();
        }
    });

    match cli::dispatch(cli.command, cli.verbose, cancel).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
