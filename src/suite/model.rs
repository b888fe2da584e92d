//! Validated suite model consumed by the engine

use std::fmt;
use std::time::Duration;

use regex::Regex;

use crate::common::normalize_whitespace;
use crate::document::{ScrollPosition, Selector};

/// A suite ready to run
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    /// Base URL from the suite file; the CLI flag takes precedence
    pub base_url: Option<String>,
    /// Steps run before every scenario
    pub setup: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

/// One independent end-to-end case
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

/// A single action within a scenario
#[derive(Debug, Clone)]
pub enum Step {
    Navigate {
        path: String,
    },
    /// Resolve a target and record how many elements matched
    Query(Target),
    Assert {
        target: Target,
        expectation: Expectation,
        timeout: Option<Duration>,
    },
    Click {
        target: Target,
        timeout: Option<Duration>,
    },
    ScrollTo(ScrollPosition),
    Wait(WaitCondition),
}

#[derive(Debug, Clone)]
pub enum WaitCondition {
    Elapsed(Duration),
    /// Block until the expectation holds, with its own timeout
    Holds {
        target: Target,
        expectation: Expectation,
        timeout: Option<Duration>,
    },
}

/// What a step operates on
#[derive(Debug, Clone)]
pub struct Target {
    pub selector: Option<Selector>,
    pub text: Option<TextMatch>,
    pub within: Option<Selector>,
}

/// Free-text matcher applied to whitespace-normalised text
#[derive(Debug, Clone)]
pub enum TextMatch {
    Substring(String),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
pub struct Expectation {
    pub predicate: Predicate,
    pub negated: bool,
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Visible,
    ContainsText(TextMatch),
    CountAtLeast(usize),
    AttributeEquals { name: String, value: String },
}

impl TextMatch {
    pub fn is_match(&self, text: &str) -> bool {
        let text = normalize_whitespace(text);
        match self {
            TextMatch::Substring(needle) => text.contains(&normalize_whitespace(needle)),
            TextMatch::Pattern(re) => re.is_match(&text),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Substring(s) => write!(f, "\"{}\"", s),
            TextMatch::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.within {
            write!(f, "{} ", scope.source())?;
        }
        match (&self.selector, &self.text) {
            (Some(sel), Some(text)) => write!(f, "{} containing {}", sel.source(), text),
            (Some(sel), None) => f.write_str(sel.source()),
            (None, Some(text)) => write!(f, "element containing {}", text),
            (None, None) => f.write_str("*"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Visible => f.write_str("be visible"),
            Predicate::ContainsText(text) => write!(f, "contain text {}", text),
            Predicate::CountAtLeast(n) => write!(f, "have at least {} element(s)", n),
            Predicate::AttributeEquals { name, value } => {
                write!(f, "have attribute {}=\"{}\"", name, value)
            }
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not {}", self.predicate)
        } else {
            write!(f, "{}", self.predicate)
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { path } => write!(f, "navigate {}", path),
            Step::Query(target) => write!(f, "query {}", target),
            Step::Assert {
                target,
                expectation,
                ..
            } => write!(f, "{} should {}", target, expectation),
            Step::Click { target, .. } => write!(f, "click {}", target),
            Step::ScrollTo(position) => write!(f, "scroll to {}", position),
            Step::Wait(WaitCondition::Elapsed(d)) => write!(f, "wait {}ms", d.as_millis()),
            Step::Wait(WaitCondition::Holds {
                target,
                expectation,
                ..
            }) => write!(f, "wait until {} should {}", target, expectation),
        }
    }
}

impl Step {
    /// The condition an outcome for this step is judged against
    pub fn expected(&self) -> String {
        match self {
            Step::Navigate { .. } => "page loads".to_string(),
            Step::Query(_) => "query resolves".to_string(),
            Step::Assert { expectation, .. }
            | Step::Wait(WaitCondition::Holds { expectation, .. }) => expectation.to_string(),
            Step::Click { .. } => "a visible element to click".to_string(),
            Step::ScrollTo(position) => format!("viewport at {}", position),
            Step::Wait(WaitCondition::Elapsed(d)) => format!("{}ms to pass", d.as_millis()),
        }
    }
}

impl Suite {
    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }
}
