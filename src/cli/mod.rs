//! CLI command handling
//!
//! Loads configuration and suites, drives the runner, and prints results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::browser::CdpProvider;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::engine::{PollConfig, Runner, RunnerOptions};
use crate::preflight;
use crate::report::{write_report, ConsoleSink};
use crate::suite::Suite;

/// Settings for one `run` invocation after merging CLI flags
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: Config,
    pub base_url: Option<String>,
    pub report: Option<PathBuf>,
    pub skip_preflight: bool,
    pub verbose: bool,
}

/// Dispatch a CLI command
///
/// Returns whether everything passed.
pub async fn dispatch(command: Commands, verbose: bool, cancel: CancellationToken) -> Result<bool> {
    match command {
        Commands::Run {
            suite,
            base_url,
            config,
            jobs,
            timeout_ms,
            poll_interval_ms,
            headed,
            report,
            skip_preflight,
        } => {
            let mut config = match config {
                Some(path) => Config::load_from(&path)?,
                None => Config::load()?,
            };
            if let Some(jobs) = jobs {
                config.runner.jobs = jobs;
            }
            if let Some(ms) = timeout_ms {
                config.timeouts.assertion_ms = ms;
            }
            if let Some(ms) = poll_interval_ms {
                config.timeouts.poll_interval_ms = ms;
            }
            if headed {
                config.browser.headless = false;
            }

            let settings = RunSettings {
                config,
                base_url,
                report,
                skip_preflight,
                verbose,
            };
            run_suite(&suite, settings, cancel).await
        }

        Commands::Check { suites } => Ok(check_suites(&suites)),
    }
}

/// Base URL precedence: CLI flag, then suite file, then config default
fn effective_base_url(cli: Option<&str>, suite: &Suite, config: &Config) -> String {
    cli.map(str::to_string)
        .or_else(|| suite.base_url.clone())
        .unwrap_or_else(|| config.defaults.base_url.clone())
}

async fn run_suite(path: &Path, settings: RunSettings, cancel: CancellationToken) -> Result<bool> {
    let suite = Suite::load(path)?;
    let config = &settings.config;
    let base_url = effective_base_url(settings.base_url.as_deref(), &suite, config);
    tracing::info!(suite = %suite.name, %base_url, "loaded suite");

    if !settings.skip_preflight {
        preflight::check_base_url(&base_url, config.timeouts.preflight()).await?;
    }

    let provider = Arc::new(CdpProvider::launch(&config.browser, &config.timeouts, &base_url).await?);

    let options = RunnerOptions {
        poll: PollConfig {
            timeout: config.timeouts.assertion(),
            interval: config.timeouts.poll_interval(),
        },
        jobs: config.runner.jobs.max(1),
    };
    let runner = Runner::new(provider.clone(), options, cancel);
    let mut sink = ConsoleSink::stdout(settings.verbose);
    let report = runner.run(&suite, &mut sink).await;
    drop(runner);

    match Arc::try_unwrap(provider) {
        Ok(provider) => provider.shutdown().await?,
        Err(_) => tracing::warn!("browser still in use at exit"),
    }

    if let Some(report_path) = &settings.report {
        write_report(&report, report_path)?;
    }

    Ok(report.all_passed())
}

fn check_suites(paths: &[PathBuf]) -> bool {
    let mut all_ok = true;
    for path in paths {
        match Suite::load(path) {
            Ok(suite) => {
                println!(
                    "{} {}: {} ({} scenario{}, {} steps)",
                    "✓".green(),
                    path.display(),
                    suite.name.bold(),
                    suite.scenarios.len(),
                    if suite.scenarios.len() == 1 { "" } else { "s" },
                    suite.step_count()
                );
                for scenario in &suite.scenarios {
                    println!(
                        "    {} {}",
                        scenario.name,
                        format!("({} steps)", scenario.steps.len()).dimmed()
                    );
                }
            }
            Err(e) => {
                all_ok = false;
                println!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }
    all_ok
}
