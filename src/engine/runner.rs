//! Suite runner
//!
//! Runs each scenario in its own document session: setup steps first, then
//! the scenario's steps, stopping at the first failure or fault. A lost
//! provider or a cancelled run marks every remaining scenario as not run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::common::{Error, Result};
use crate::document::{DocumentProvider, DocumentSession};
use crate::report::{
    AssertionOutcome, Discard, Fault, Phase, Report, ReportSink, ScenarioReport, ScenarioStatus,
};
use crate::suite::{Scenario, Step, Suite, WaitCondition};

use super::driver;
use super::evaluator::check_eventually;
use super::poll::{sleep_cancellable, PollConfig};
use super::resolver::resolve;

#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    pub poll: PollConfig,
    /// Scenarios run concurrently, each in its own session
    pub jobs: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            jobs: 1,
        }
    }
}

/// Verdict of one step that ran to completion
struct StepResult {
    passed: bool,
    actual: String,
}

impl StepResult {
    fn done(actual: impl Into<String>) -> Self {
        Self {
            passed: true,
            actual: actual.into(),
        }
    }
}

/// Executes suites against a document provider
pub struct Runner {
    provider: Arc<dyn DocumentProvider>,
    options: RunnerOptions,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        provider: Arc<dyn DocumentProvider>,
        options: RunnerOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            options,
            cancel,
        }
    }

    /// Run every scenario of `suite`, streaming results to `sink`
    pub async fn run(&self, suite: &Suite, sink: &mut dyn ReportSink) -> Report {
        let started = Instant::now();
        let aborted = AtomicBool::new(false);
        sink.suite_started(&suite.name, suite.scenarios.len());
        tracing::info!(suite = %suite.name, scenarios = suite.scenarios.len(), jobs = self.options.jobs, "running suite");

        let mut scenarios = Vec::with_capacity(suite.scenarios.len());
        if self.options.jobs <= 1 {
            for scenario in &suite.scenarios {
                if self.should_skip(&aborted) {
                    let report = ScenarioReport::not_run(&scenario.name);
                    sink.scenario_finished(&report);
                    scenarios.push(report);
                    continue;
                }
                sink.scenario_started(scenario);
                let report = self.run_scenario(suite, scenario, &aborted, sink).await;
                sink.scenario_finished(&report);
                scenarios.push(report);
            }
        } else {
            // Results are replayed in declaration order once all have finished
            let reports: Vec<ScenarioReport> = stream::iter(&suite.scenarios)
                .map(|scenario| {
                    let aborted = &aborted;
                    async move {
                        if self.should_skip(aborted) {
                            return ScenarioReport::not_run(&scenario.name);
                        }
                        self.run_scenario(suite, scenario, aborted, &mut Discard).await
                    }
                })
                .buffered(self.options.jobs)
                .collect()
                .await;

            for (scenario, report) in suite.scenarios.iter().zip(reports) {
                if report.status != ScenarioStatus::NotRun {
                    sink.scenario_started(scenario);
                    for outcome in &report.outcomes {
                        sink.outcome(outcome);
                    }
                }
                sink.scenario_finished(&report);
                scenarios.push(report);
            }
        }

        let report = Report {
            suite: suite.name.clone(),
            scenarios,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            passed = report.passed(),
            failed = report.failed(),
            faulted = report.faulted(),
            not_run = report.not_run(),
            "suite finished"
        );
        sink.suite_finished(&report);
        report
    }

    fn should_skip(&self, aborted: &AtomicBool) -> bool {
        aborted.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    async fn run_scenario(
        &self,
        suite: &Suite,
        scenario: &Scenario,
        aborted: &AtomicBool,
        sink: &mut dyn ReportSink,
    ) -> ScenarioReport {
        let span = tracing::info_span!("scenario", name = %scenario.name);
        async move {
            let started = Instant::now();
            let mut report = ScenarioReport {
                name: scenario.name.clone(),
                status: ScenarioStatus::Passed,
                outcomes: Vec::new(),
                fault: None,
                elapsed_ms: 0,
            };

            let mut session = match self.provider.open_session().await {
                Ok(session) => session,
                Err(e) => {
                    self.record_fault(&mut report, e, None, aborted);
                    report.elapsed_ms = started.elapsed().as_millis() as u64;
                    return report;
                }
            };

            let phases = [(Phase::Setup, &suite.setup), (Phase::Body, &scenario.steps)];
            'phases: for (phase, steps) in phases {
                for (index, step) in steps.iter().enumerate() {
                    tracing::debug!(?phase, step = index + 1, "{}", step);
                    let step_started = Instant::now();

                    let result = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => Err(Error::Cancelled),
                        result = self.execute_step(session.as_mut(), step) => result,
                    };

                    match result {
                        Ok(result) => {
                            let outcome = AssertionOutcome {
                                scenario: scenario.name.clone(),
                                phase,
                                step_index: index,
                                step: step.to_string(),
                                expected: step.expected(),
                                actual: result.actual,
                                passed: result.passed,
                                elapsed_ms: step_started.elapsed().as_millis() as u64,
                            };
                            sink.outcome(&outcome);
                            report.outcomes.push(outcome);
                            if !result.passed {
                                tracing::info!(step = index + 1, "assertion failed");
                                report.status = ScenarioStatus::Failed;
                                break 'phases;
                            }
                        }
                        Err(e) => {
                            self.record_fault(&mut report, e, Some((phase, index)), aborted);
                            break 'phases;
                        }
                    }
                }
            }

            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "failed to close session");
            }
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!(status = %report.status, elapsed_ms = report.elapsed_ms, "scenario finished");
            report
        }
        .instrument(span)
        .await
    }

    fn record_fault(
        &self,
        report: &mut ScenarioReport,
        error: Error,
        at: Option<(Phase, usize)>,
        aborted: &AtomicBool,
    ) {
        let kind = error.fault_kind();
        if error.is_fatal_to_suite() {
            tracing::error!(error = %error, "aborting remaining scenarios");
            aborted.store(true, Ordering::SeqCst);
        } else {
            tracing::warn!(error = %error, "scenario faulted");
        }
        report.status = ScenarioStatus::Faulted;
        report.fault = Some(Fault {
            kind,
            code: kind.code().to_string(),
            message: error.to_string(),
            phase: at.map(|(phase, _)| phase),
            step_index: at.map(|(_, index)| index),
        });
    }

    async fn execute_step(&self, session: &mut dyn DocumentSession, step: &Step) -> Result<StepResult> {
        let poll = self.options.poll;
        match step {
            Step::Navigate { path } => {
                session.navigate(path).await?;
                Ok(StepResult::done(format!("loaded {}", path)))
            }

            Step::Query(target) => {
                let result = resolve(session, target).await?;
                Ok(StepResult::done(format!("{} element(s) matched", result.len())))
            }

            Step::Assert {
                target,
                expectation,
                timeout,
            }
            | Step::Wait(WaitCondition::Holds {
                target,
                expectation,
                timeout,
            }) => {
                let evaluation = check_eventually(
                    session,
                    target,
                    expectation,
                    poll.with_timeout(*timeout),
                    &self.cancel,
                )
                .await?;
                Ok(StepResult {
                    passed: evaluation.holds,
                    actual: evaluation.actual,
                })
            }

            Step::Click { target, timeout } => {
                let element =
                    driver::click(session, target, poll.with_timeout(*timeout), &self.cancel).await?;
                Ok(StepResult::done(format!("clicked {}", element.describe())))
            }

            Step::ScrollTo(position) => {
                driver::scroll_to(session, *position).await?;
                Ok(StepResult::done(format!("scrolled to {}", position)))
            }

            Step::Wait(WaitCondition::Elapsed(duration)) => {
                sleep_cancellable(*duration, &self.cancel).await?;
                Ok(StepResult::done(format!("waited {}ms", duration.as_millis())))
            }
        }
    }
}
