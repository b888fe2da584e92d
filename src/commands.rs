//! CLI command definitions
//!
//! Defines the clap commands for the pagecheck CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a suite against a live page
    Run {
        /// Path to the suite file (YAML)
        suite: PathBuf,

        /// Base URL of the page under test (overrides suite and config)
        #[arg(long)]
        base_url: Option<String>,

        /// Configuration file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Scenarios to run at once, each in its own browser context
        #[arg(long, short)]
        jobs: Option<usize>,

        /// How long an assertion keeps retrying, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Delay between assertion retries, in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Do not check that the base URL answers before launching
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Validate suite files without launching a browser
    Check {
        /// Suite files to validate
        #[arg(required = true)]
        suites: Vec<PathBuf>,
    },
}
