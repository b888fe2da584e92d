//! Suite file types
//!
//! Defines the data structures for deserializing YAML suites and their
//! validation into the engine model.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use regex::Regex;

use crate::common::{Error, Result};
use crate::document::{ScrollPosition, Selector};

use super::model::{Expectation, Predicate, Scenario, Step, Suite, Target, TextMatch, WaitCondition};

/// A suite as written in the YAML file
#[derive(Deserialize, Debug)]
pub struct SuiteFile {
    /// Name of the suite
    pub name: String,
    /// Optional base URL of the page under test
    pub base_url: Option<String>,
    /// Steps run before each scenario (e.g. navigating to `/`)
    #[serde(default)]
    pub before_each: Vec<StepFile>,
    /// The scenarios, run in order
    pub scenarios: Vec<ScenarioFile>,
}

/// One scenario in the suite file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    pub steps: Vec<StepFile>,
}

/// A single step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepFile {
    /// Load a page relative to the base URL
    #[serde(alias = "visit")]
    Navigate { path: String },
    /// Make a target the subject of following steps
    #[serde(alias = "get")]
    Query {
        selector: Option<String>,
        contains: Option<String>,
        matches: Option<String>,
        within: Option<String>,
    },
    /// Check an expectation, re-polling until it holds or times out
    #[serde(alias = "should")]
    Assert {
        selector: Option<String>,
        contains: Option<String>,
        matches: Option<String>,
        within: Option<String>,
        /// Chainer, e.g. `be.visible`, `contain.text`, `not.be.visible`
        should: String,
        text: Option<String>,
        pattern: Option<String>,
        count: Option<usize>,
        name: Option<String>,
        value: Option<String>,
        timeout_ms: Option<u64>,
    },
    /// Click the subject (or an explicit target)
    Click {
        selector: Option<String>,
        contains: Option<String>,
        matches: Option<String>,
        within: Option<String>,
        timeout_ms: Option<u64>,
    },
    /// Scroll the viewport to `top`, `bottom`, or `x`/`y`
    ScrollTo {
        position: Option<String>,
        x: Option<i64>,
        y: Option<i64>,
    },
    /// Sleep for `ms`, or wait until an expectation holds
    Wait {
        ms: Option<u64>,
        selector: Option<String>,
        contains: Option<String>,
        matches: Option<String>,
        within: Option<String>,
        should: Option<String>,
        text: Option<String>,
        pattern: Option<String>,
        count: Option<usize>,
        name: Option<String>,
        value: Option<String>,
        timeout_ms: Option<u64>,
    },
}

impl Suite {
    /// Load and validate a suite file
    pub fn load(path: &Path) -> Result<Suite> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// Parse and validate suite text; `origin` names it in errors
    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Suite> {
        let file: SuiteFile = serde_yaml::from_str(content).map_err(|e| Error::SuiteParse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        file.validate(origin)
    }
}

impl SuiteFile {
    /// Convert into the engine model, checking selectors, patterns and
    /// step arguments
    pub fn validate(self, origin: &str) -> Result<Suite> {
        let wrap = |context: String, e: Error| Error::SuiteParse {
            path: origin.to_string(),
            message: format!("{}: {}", context, e),
        };

        let setup = build_steps(self.before_each)
            .map_err(|(i, e)| wrap(format!("before_each step {}", i + 1), e))?;

        let mut scenarios = Vec::with_capacity(self.scenarios.len());
        for scenario in self.scenarios {
            let steps = build_steps(scenario.steps).map_err(|(i, e)| {
                wrap(format!("scenario '{}', step {}", scenario.name, i + 1), e)
            })?;
            scenarios.push(Scenario {
                name: scenario.name,
                description: scenario.description,
                steps,
            });
        }

        if scenarios.is_empty() {
            return Err(Error::SuiteParse {
                path: origin.to_string(),
                message: "suite has no scenarios".to_string(),
            });
        }

        Ok(Suite {
            name: self.name,
            base_url: self.base_url,
            setup,
            scenarios,
        })
    }
}

/// Raw target fields shared by several step kinds
struct TargetFields {
    selector: Option<String>,
    contains: Option<String>,
    matches: Option<String>,
    within: Option<String>,
}

impl TargetFields {
    fn is_empty(&self) -> bool {
        self.selector.is_none()
            && self.contains.is_none()
            && self.matches.is_none()
            && self.within.is_none()
    }

    fn build(self) -> Result<Option<Target>> {
        if self.is_empty() {
            return Ok(None);
        }
        let text = match (self.contains, self.matches) {
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "use either 'contains' or 'matches', not both".to_string(),
                ))
            }
            (Some(s), None) => Some(TextMatch::Substring(s)),
            (None, Some(p)) => Some(TextMatch::Pattern(compile_pattern(&p)?)),
            (None, None) => None,
        };
        let selector = self.selector.as_deref().map(Selector::parse).transpose()?;
        if selector.is_none() && text.is_none() {
            return Err(Error::Config(
                "'within' needs a 'selector', 'contains' or 'matches'".to_string(),
            ));
        }
        Ok(Some(Target {
            selector,
            text,
            within: self.within.as_deref().map(Selector::parse).transpose()?,
        }))
    }
}

/// Raw expectation fields shared by `assert` and `wait`
struct ExpectationFields {
    should: String,
    text: Option<String>,
    pattern: Option<String>,
    count: Option<usize>,
    name: Option<String>,
    value: Option<String>,
}

impl ExpectationFields {
    fn build(self) -> Result<Expectation> {
        let chainer = self.should.trim().to_ascii_lowercase();
        let (negated, chainer) = match chainer
            .strip_prefix("not.")
            .or_else(|| chainer.strip_prefix("not_"))
        {
            Some(rest) => (true, rest.to_string()),
            None => (false, chainer.clone()),
        };

        let predicate = match chainer.as_str() {
            "be.visible" | "visible" | "be_visible" => Predicate::Visible,
            "contain.text" | "contain" | "contains_text" | "contain_text" => {
                match (self.text, self.pattern) {
                    (Some(text), None) => Predicate::ContainsText(TextMatch::Substring(text)),
                    (None, Some(p)) => Predicate::ContainsText(TextMatch::Pattern(compile_pattern(&p)?)),
                    _ => {
                        return Err(Error::Config(format!(
                            "'{}' needs exactly one of 'text' or 'pattern'",
                            self.should
                        )))
                    }
                }
            }
            "have.length.at.least" | "have.length.gte" | "count_at_least" => {
                let count = self.count.ok_or_else(|| {
                    Error::Config(format!("'{}' needs a 'count'", self.should))
                })?;
                Predicate::CountAtLeast(count)
            }
            "exist" => Predicate::CountAtLeast(1),
            "have.attr" | "attribute_equals" | "have_attr" => match (self.name, self.value) {
                (Some(name), Some(value)) => Predicate::AttributeEquals { name, value },
                _ => {
                    return Err(Error::Config(format!(
                        "'{}' needs 'name' and 'value'",
                        self.should
                    )))
                }
            },
            _ => {
                return Err(Error::Config(format!(
                    "unknown chainer '{}'; expected be.visible, contain.text, \
                     have.length.at.least, have.attr or exist (optionally prefixed with not.)",
                    self.should
                )))
            }
        };

        Ok(Expectation { predicate, negated })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn millis(ms: Option<u64>) -> Option<Duration> {
    ms.map(Duration::from_millis)
}

/// Pick the explicit target or fall back to the current subject
fn target_or_subject(explicit: Option<Target>, subject: &Option<Target>, action: &str) -> Result<Target> {
    explicit.or_else(|| subject.clone()).ok_or_else(|| {
        Error::Config(format!(
            "'{}' has no target; add a selector or a preceding 'query' step",
            action
        ))
    })
}

/// Validate a step list, tracking the chained subject
///
/// On error returns the index of the offending step.
fn build_steps(raw: Vec<StepFile>) -> std::result::Result<Vec<Step>, (usize, Error)> {
    let mut subject: Option<Target> = None;
    let mut steps = Vec::with_capacity(raw.len());

    for (i, step) in raw.into_iter().enumerate() {
        let built = build_step(step, &mut subject).map_err(|e| (i, e))?;
        steps.push(built);
    }
    Ok(steps)
}

fn build_step(step: StepFile, subject: &mut Option<Target>) -> Result<Step> {
    match step {
        StepFile::Navigate { path } => {
            *subject = None;
            Ok(Step::Navigate { path })
        }

        StepFile::Query {
            selector,
            contains,
            matches,
            within,
        } => {
            let target = TargetFields {
                selector,
                contains,
                matches,
                within,
            }
            .build()?
            .ok_or_else(|| {
                Error::Config("'query' needs a 'selector', 'contains' or 'matches'".to_string())
            })?;
            *subject = Some(target.clone());
            Ok(Step::Query(target))
        }

        StepFile::Assert {
            selector,
            contains,
            matches,
            within,
            should,
            text,
            pattern,
            count,
            name,
            value,
            timeout_ms,
        } => {
            let explicit = TargetFields {
                selector,
                contains,
                matches,
                within,
            }
            .build()?;
            let target = target_or_subject(explicit, subject, "assert")?;
            let expectation = ExpectationFields {
                should,
                text,
                pattern,
                count,
                name,
                value,
            }
            .build()?;
            *subject = Some(target.clone());
            Ok(Step::Assert {
                target,
                expectation,
                timeout: millis(timeout_ms),
            })
        }

        StepFile::Click {
            selector,
            contains,
            matches,
            within,
            timeout_ms,
        } => {
            let explicit = TargetFields {
                selector,
                contains,
                matches,
                within,
            }
            .build()?;
            let target = target_or_subject(explicit, subject, "click")?;
            *subject = Some(target.clone());
            Ok(Step::Click {
                target,
                timeout: millis(timeout_ms),
            })
        }

        StepFile::ScrollTo { position, x, y } => {
            let position = match (position.as_deref().map(str::trim), x, y) {
                (Some("top"), None, None) => ScrollPosition::Top,
                (Some("bottom"), None, None) => ScrollPosition::Bottom,
                (None, Some(_), _) | (None, _, Some(_)) => ScrollPosition::Coordinate {
                    x: x.unwrap_or(0),
                    y: y.unwrap_or(0),
                },
                (Some(other), None, None) => {
                    return Err(Error::Config(format!(
                        "unknown scroll position '{}'; expected top, bottom, or x/y",
                        other
                    )))
                }
                (Some(_), _, _) => {
                    return Err(Error::Config(
                        "use either 'position' or 'x'/'y', not both".to_string(),
                    ))
                }
                (None, None, None) => {
                    return Err(Error::Config(
                        "'scroll_to' needs a 'position' or 'x'/'y'".to_string(),
                    ))
                }
            };
            Ok(Step::ScrollTo(position))
        }

        StepFile::Wait {
            ms,
            selector,
            contains,
            matches,
            within,
            should,
            text,
            pattern,
            count,
            name,
            value,
            timeout_ms,
        } => {
            let explicit = TargetFields {
                selector,
                contains,
                matches,
                within,
            }
            .build()?;
            match (ms, should) {
                (Some(ms), None) if explicit.is_none() => {
                    Ok(Step::Wait(WaitCondition::Elapsed(Duration::from_millis(ms))))
                }
                (None, Some(should)) => {
                    let target = target_or_subject(explicit, subject, "wait")?;
                    let expectation = ExpectationFields {
                        should,
                        text,
                        pattern,
                        count,
                        name,
                        value,
                    }
                    .build()?;
                    *subject = Some(target.clone());
                    Ok(Step::Wait(WaitCondition::Holds {
                        target,
                        expectation,
                        timeout: millis(timeout_ms),
                    }))
                }
                _ => Err(Error::Config(
                    "'wait' needs either 'ms' alone or a 'should' expectation".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: &str) -> Result<Suite> {
        Suite::from_yaml_str(yaml, "test.yaml")
    }

    #[test]
    fn test_load_landing_suite() {
        let suite = load(
            r##"
name: Smoke Tests - Landing Page
before_each:
  - action: navigate
    path: /
scenarios:
  - name: navigation
    steps:
      - action: assert
        selector: 'nav a[href="#how"]'
        should: be.visible
      - action: click
      - action: assert
        selector: h3
        contains: Pick a Time
        should: be.visible
      - action: assert
        selector: main section
        should: have.length.at.least
        count: 3
      - action: scroll_to
        position: bottom
      - action: wait
        ms: 100
"##,
        )
        .unwrap();

        assert_eq!(suite.name, "Smoke Tests - Landing Page");
        assert_eq!(suite.setup.len(), 1);
        let steps = &suite.scenarios[0].steps;
        assert_eq!(steps.len(), 6);
        match &steps[1] {
            Step::Click { target, .. } => {
                assert_eq!(target.selector.as_ref().unwrap().source(), r##"nav a[href="#how"]"##)
            }
            other => panic!("expected click, got {:?}", other),
        }
        assert!(matches!(
            steps[3],
            Step::Assert {
                expectation: Expectation {
                    predicate: Predicate::CountAtLeast(3),
                    negated: false
                },
                ..
            }
        ));
        assert!(matches!(steps[4], Step::ScrollTo(ScrollPosition::Bottom)));
    }

    #[test]
    fn test_chainer_vocabulary() {
        let suite = load(
            r#"
name: chainers
scenarios:
  - name: all
    steps:
      - action: query
        selector: footer
      - action: assert
        should: contain.text
        text: San Diego
      - action: assert
        should: not.be.visible
      - action: assert
        selector: img
        should: have.attr
        name: alt
        value: logo
      - action: assert
        contains: Staycation energy
        should: visible
      - action: assert
        selector: p.quote
        matches: ".*"
        should: exist
"#,
        )
        .unwrap();
        let steps = &suite.scenarios[0].steps;
        match &steps[1] {
            Step::Assert {
                target,
                expectation,
                ..
            } => {
                assert_eq!(target.selector.as_ref().unwrap().source(), "footer");
                assert!(matches!(expectation.predicate, Predicate::ContainsText(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &steps[2] {
            Step::Assert { expectation, .. } => {
                assert!(expectation.negated);
                assert!(matches!(expectation.predicate, Predicate::Visible));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            &steps[5],
            Step::Assert {
                expectation: Expectation {
                    predicate: Predicate::CountAtLeast(1),
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn test_wait_for_expectation() {
        let suite = load(
            r#"
name: wait
scenarios:
  - name: sticky
    steps:
      - action: wait
        selector: .sticky-cta
        should: be.visible
        timeout_ms: 8000
"#,
        )
        .unwrap();
        match &suite.scenarios[0].steps[0] {
            Step::Wait(WaitCondition::Holds { timeout, .. }) => {
                assert_eq!(*timeout, Some(Duration::from_millis(8000)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assert_without_subject_is_rejected() {
        let err = load(
            r#"
name: bad
scenarios:
  - name: orphan
    steps:
      - action: navigate
        path: /
      - action: assert
        should: be.visible
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("scenario 'orphan', step 2"), "{}", message);
        assert!(message.contains("no target"), "{}", message);
    }

    #[test]
    fn test_navigate_resets_subject() {
        let err = load(
            r#"
name: bad
scenarios:
  - name: reset
    steps:
      - action: query
        selector: header
      - action: navigate
        path: /about
      - action: click
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("step 3"));
    }

    #[test]
    fn test_invalid_selector_reported_with_location() {
        let err = load(
            r#"
name: bad
scenarios:
  - name: selector
    steps:
      - action: assert
        selector: "a[href"
        should: be.visible
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Invalid selector"), "{}", message);
        assert!(message.contains("step 1"), "{}", message);
    }

    #[test]
    fn test_argument_errors() {
        let cases = [
            ("should: contain.text", "needs exactly one of"),
            ("should: have.length.at.least", "needs a 'count'"),
            ("should: have.attr\n        name: alt", "needs 'name' and 'value'"),
            ("should: be.shiny", "unknown chainer"),
        ];
        for (fields, expected) in cases {
            let yaml = format!(
                "name: s\nscenarios:\n  - name: c\n    steps:\n      - action: assert\n        selector: h1\n        {}\n",
                fields
            );
            let message = load(&yaml).unwrap_err().to_string();
            assert!(message.contains(expected), "{} -> {}", fields, message);
        }
    }

    #[test]
    fn test_invalid_pattern() {
        let err = load(
            r#"
name: bad
scenarios:
  - name: regex
    steps:
      - action: query
        matches: "(unclosed"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid text pattern"));
    }

    #[test]
    fn test_scroll_positions() {
        let suite = load(
            r#"
name: scroll
scenarios:
  - name: s
    steps:
      - action: scroll_to
        position: top
      - action: scroll_to
        y: 600
"#,
        )
        .unwrap();
        assert!(matches!(suite.scenarios[0].steps[0], Step::ScrollTo(ScrollPosition::Top)));
        assert!(matches!(
            suite.scenarios[0].steps[1],
            Step::ScrollTo(ScrollPosition::Coordinate { x: 0, y: 600 })
        ));

        let err = load("name: s\nscenarios:\n  - name: c\n    steps:\n      - action: scroll_to\n        position: middle\n").unwrap_err();
        assert!(err.to_string().contains("unknown scroll position"));
    }

    #[test]
    fn test_unknown_action_and_empty_suite() {
        let err = load("name: s\nscenarios:\n  - name: c\n    steps:\n      - action: hover\n").unwrap_err();
        assert!(matches!(err, Error::SuiteParse { .. }));

        let err = load("name: s\nscenarios: []\n").unwrap_err();
        assert!(err.to_string().contains("no scenarios"));
    }

    #[test]
    fn test_action_aliases() {
        let suite = load(
            "name: s\nscenarios:\n  - name: c\n    steps:\n      - action: visit\n        path: /\n      - action: get\n        selector: header\n      - action: should\n        should: be.visible\n",
        )
        .unwrap();
        assert_eq!(suite.scenarios[0].steps.len(), 3);
    }
}
