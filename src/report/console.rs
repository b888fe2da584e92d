//! Colored console output

use std::io::Write;

use colored::Colorize;

use crate::suite::Scenario;

use super::{AssertionOutcome, Phase, Report, ReportSink, ScenarioReport, ScenarioStatus};

/// Human-readable progress on a writer (stdout by default)
pub struct ConsoleSink<W: Write = std::io::Stdout> {
    out: W,
    verbose: bool,
}

impl ConsoleSink {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(std::io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Console output is best effort; a closed stdout must not fail the run.
impl<W: Write> ReportSink for ConsoleSink<W> {
    fn suite_started(&mut self, suite: &str, scenarios: usize) {
        let _ = writeln!(
            self.out,
            "\n{} {} ({} scenario{})",
            "Running Suite:".blue().bold(),
            suite.white().bold(),
            scenarios,
            if scenarios == 1 { "" } else { "s" }
        );
    }

    fn scenario_started(&mut self, scenario: &Scenario) {
        let _ = writeln!(self.out, "\n{} {}", "Scenario:".cyan(), scenario.name.bold());
        if let Some(desc) = &scenario.description {
            let _ = writeln!(self.out, "  {}", desc.dimmed());
        }
    }

    fn outcome(&mut self, outcome: &AssertionOutcome) {
        let label = match outcome.phase {
            Phase::Setup => format!("[setup] {}", outcome.step),
            Phase::Body => format!("Step {}: {}", outcome.step_index + 1, outcome.step),
        };
        if outcome.passed {
            if self.verbose {
                let _ = writeln!(
                    self.out,
                    "  {} {} {}",
                    "✓".green(),
                    label,
                    format!("({}, {}ms)", outcome.actual, outcome.elapsed_ms).dimmed()
                );
            } else {
                let _ = writeln!(self.out, "  {} {}", "✓".green(), label);
            }
        } else {
            let _ = writeln!(self.out, "  {} {}", "✗".red(), label);
            let _ = writeln!(self.out, "      Expected: {}", outcome.expected);
            let _ = writeln!(self.out, "      Actual:   {}", outcome.actual.red());
        }
    }

    fn scenario_finished(&mut self, report: &ScenarioReport) {
        if let Some(fault) = &report.fault {
            let location = match (fault.phase, fault.step_index) {
                (Some(Phase::Setup), Some(i)) => format!(" at setup step {}", i + 1),
                (Some(Phase::Body), Some(i)) => format!(" at step {}", i + 1),
                _ => String::new(),
            };
            let _ = writeln!(
                self.out,
                "  {} {}{}: {}",
                "⚠".yellow(),
                fault.code.yellow(),
                location,
                fault.message
            );
        }
        let status = report.status.to_string();
        let status = match report.status {
            ScenarioStatus::Passed => status.green().bold(),
            ScenarioStatus::Failed => status.red().bold(),
            ScenarioStatus::Faulted => status.yellow().bold(),
            ScenarioStatus::NotRun => status.dimmed(),
        };
        if report.status == ScenarioStatus::NotRun {
            let _ = writeln!(self.out, "\n{} {} {}", "Scenario:".cyan(), report.name.bold(), status);
        } else {
            let _ = writeln!(self.out, "  {} ({}ms)", status, report.elapsed_ms);
        }
    }

    fn suite_finished(&mut self, report: &Report) {
        let _ = writeln!(self.out);
        let summary = format!(
            "{} passed, {} failed, {} faulted, {} not run",
            report.passed(),
            report.failed(),
            report.faulted(),
            report.not_run()
        );
        let summary = if report.all_passed() {
            summary.green().bold()
        } else {
            summary.red().bold()
        };
        let _ = writeln!(
            self.out,
            "{} {} ({:.2}s)",
            "Summary:".bold(),
            summary,
            report.elapsed_ms as f64 / 1000.0
        );
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(passed: bool) -> AssertionOutcome {
        AssertionOutcome {
            scenario: "nav".into(),
            phase: Phase::Body,
            step_index: 2,
            step: "button.cta should have at least 1 element(s)".into(),
            expected: "have at least 1 element(s)".into(),
            actual: "0 element(s)".into(),
            passed,
            elapsed_ms: 4000,
        }
    }

    #[test]
    fn test_failed_outcome_shows_expected_and_actual() {
        let mut sink = ConsoleSink::new(Vec::new(), false);
        sink.outcome(&outcome(false));
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("Step 3: button.cta should have at least 1 element(s)"));
        assert!(text.contains("Expected: have at least 1 element(s)"));
        assert!(text.contains("Actual:"));
        assert!(text.contains("0 element(s)"));
    }

    #[test]
    fn test_summary_line() {
        let mut sink = ConsoleSink::new(Vec::new(), false);
        let report = Report {
            suite: "smoke".into(),
            scenarios: vec![ScenarioReport::not_run("a")],
            elapsed_ms: 1500,
        };
        sink.suite_finished(&report);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("0 passed, 0 failed, 0 faulted, 1 not run"));
        assert!(text.contains("1.50s"));
    }
}
