//! Run results and report sinks
//!
//! The runner streams [`AssertionOutcome`]s to a [`ReportSink`] as steps
//! complete and returns the full [`Report`] at the end.

mod console;
mod json;

use serde::{Deserialize, Serialize};

use crate::common::FaultKind;
use crate::suite::Scenario;

pub use console::ConsoleSink;
pub use json::write_report;

/// Which step list a step came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// `before_each`
    Setup,
    /// The scenario's own steps
    Body,
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub scenario: String,
    pub phase: Phase,
    /// Zero-based index within the phase
    pub step_index: usize,
    /// What the step does, e.g. `h3 containing "Pick a Time" should be visible`
    pub step: String,
    /// The condition it was judged against
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    pub elapsed_ms: u64,
}

impl AssertionOutcome {
    /// Same step and verdict, ignoring timing
    pub fn same_result(&self, other: &AssertionOutcome) -> bool {
        self.scenario == other.scenario
            && self.phase == other.phase
            && self.step_index == other.step_index
            && self.step == other.step
            && self.expected == other.expected
            && self.actual == other.actual
            && self.passed == other.passed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    /// An expectation did not hold
    Failed,
    /// The harness could not finish the scenario
    Faulted,
    /// Skipped after the provider was lost or the run was cancelled
    NotRun,
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScenarioStatus::Passed => "PASSED",
            ScenarioStatus::Failed => "FAILED",
            ScenarioStatus::Faulted => "FAULTED",
            ScenarioStatus::NotRun => "NOT RUN",
        })
    }
}

/// Harness error that ended a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub code: String,
    pub message: String,
    /// Step that raised it; `None` when opening the session failed
    pub phase: Option<Phase>,
    pub step_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub status: ScenarioStatus,
    pub outcomes: Vec<AssertionOutcome>,
    pub fault: Option<Fault>,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    pub fn not_run(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::NotRun,
            outcomes: Vec::new(),
            fault: None,
            elapsed_ms: 0,
        }
    }
}

/// Results of a whole suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub suite: String,
    pub scenarios: Vec<ScenarioReport>,
    pub elapsed_ms: u64,
}

impl Report {
    fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    pub fn passed(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    pub fn faulted(&self) -> usize {
        self.count(ScenarioStatus::Faulted)
    }

    pub fn not_run(&self) -> usize {
        self.count(ScenarioStatus::NotRun)
    }

    /// True iff every scenario ran and passed
    pub fn all_passed(&self) -> bool {
        self.scenarios
            .iter()
            .all(|s| s.status == ScenarioStatus::Passed)
    }
}

/// Receives results while a suite runs
///
/// Every method defaults to doing nothing.
pub trait ReportSink {
    fn suite_started(&mut self, _suite: &str, _scenarios: usize) {}

    fn scenario_started(&mut self, _scenario: &Scenario) {}

    fn outcome(&mut self, _outcome: &AssertionOutcome) {}

    fn scenario_finished(&mut self, _report: &ScenarioReport) {}

    fn suite_finished(&mut self, _report: &Report) {}
}

/// Sink that ignores everything
pub struct Discard;

impl ReportSink for Discard {}

/// Sink that records the event stream, for tests and embedding
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<String>,
    pub outcomes: Vec<AssertionOutcome>,
}

impl ReportSink for Recorder {
    fn suite_started(&mut self, suite: &str, scenarios: usize) {
        self.events.push(format!("suite {} ({})", suite, scenarios));
    }

    fn scenario_started(&mut self, scenario: &Scenario) {
        self.events.push(format!("start {}", scenario.name));
    }

    fn outcome(&mut self, outcome: &AssertionOutcome) {
        self.events.push(format!(
            "{} {}",
            if outcome.passed { "pass" } else { "fail" },
            outcome.step
        ));
        self.outcomes.push(outcome.clone());
    }

    fn scenario_finished(&mut self, report: &ScenarioReport) {
        self.events.push(format!("finish {} {}", report.name, report.status));
    }

    fn suite_finished(&mut self, report: &Report) {
        self.events.push(format!("done {}", report.suite));
    }
}
