//! Assertion evaluation
//!
//! [`evaluate`] checks one expectation against one query result.
//! [`check_eventually`] re-resolves and re-evaluates until the expectation
//! holds or the poll window closes.

use tokio_util::sync::CancellationToken;

use crate::common::{normalize_whitespace, Result};
use crate::document::DocumentSession;
use crate::suite::{Expectation, Predicate, Target};

use super::poll::{PollConfig, Poller};
use super::resolver::{resolve, QueryResult};

/// Longest text excerpt quoted in an outcome
const EXCERPT_LEN: usize = 80;

/// Result of evaluating an expectation once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub holds: bool,
    /// What was observed, phrased for a report
    pub actual: String,
}

/// Evaluate `expectation` against `result`
pub fn evaluate(expectation: &Expectation, result: &QueryResult) -> Evaluation {
    let (holds, actual) = match &expectation.predicate {
        Predicate::Visible => {
            let visible = result.visible_count();
            let actual = match (result.len(), visible) {
                (0, _) => "no elements matched".to_string(),
                (n, 0) => format!("{} element(s) matched, none visible", n),
                (n, v) => format!("{} element(s) matched, {} visible", n, v),
            };
            (visible > 0, actual)
        }

        Predicate::ContainsText(text) => {
            if result.is_empty() {
                (false, "no elements matched".to_string())
            } else {
                let content = result.concatenated_text();
                (text.is_match(&content), format!("text \"{}\"", excerpt(&content)))
            }
        }

        Predicate::CountAtLeast(n) => (result.len() >= *n, format!("{} element(s)", result.len())),

        Predicate::AttributeEquals { name, value } => {
            let holds = result
                .elements
                .iter()
                .any(|e| e.attribute(name) == Some(value.as_str()));
            let observed: Vec<String> = result
                .elements
                .iter()
                .map(|e| match e.attribute(name) {
                    Some(v) => format!("{}=\"{}\"", name, v),
                    None => format!("no {}", name),
                })
                .collect();
            let actual = if observed.is_empty() {
                "no elements matched".to_string()
            } else {
                observed.join(", ")
            };
            (holds, actual)
        }
    };

    Evaluation {
        holds: holds != expectation.negated,
        actual,
    }
}

fn excerpt(text: &str) -> String {
    let text = normalize_whitespace(text);
    if text.chars().count() <= EXCERPT_LEN {
        return text;
    }
    let mut cut: String = text.chars().take(EXCERPT_LEN).collect();
    cut.push('…');
    cut
}

/// Poll `target` until `expectation` holds or the window closes
///
/// Returns the last evaluation either way; resolution errors end the poll
/// immediately.
pub async fn check_eventually(
    session: &mut dyn DocumentSession,
    target: &Target,
    expectation: &Expectation,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<Evaluation> {
    let mut poller = Poller::new(config, cancel);
    loop {
        let result = resolve(session, target).await?;
        let evaluation = evaluate(expectation, &result);
        if evaluation.holds {
            tracing::debug!(attempts = poller.attempts(), "expectation holds");
            return Ok(evaluation);
        }
        if !poller.tick().await? {
            tracing::debug!(attempts = poller.attempts(), actual = %evaluation.actual, "expectation timed out");
            return Ok(evaluation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementHandle, ElementSnapshot};
    use crate::suite::TextMatch;

    fn element(visible: bool, text: &str, attrs: &[(&str, &str)]) -> ElementSnapshot {
        ElementSnapshot {
            handle: ElementHandle {
                selector: "*".into(),
                index: 0,
            },
            tag: "div".into(),
            visible,
            text: text.into(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            path: vec![],
        }
    }

    fn result(elements: Vec<ElementSnapshot>) -> QueryResult {
        QueryResult {
            target: "div".into(),
            elements,
        }
    }

    fn expect(predicate: Predicate) -> Expectation {
        Expectation {
            predicate,
            negated: false,
        }
    }

    #[test]
    fn test_visible_needs_one_visible_match() {
        let e = expect(Predicate::Visible);
        assert!(!evaluate(&e, &result(vec![])).holds);
        let hidden = evaluate(&e, &result(vec![element(false, "", &[])]));
        assert!(!hidden.holds);
        assert_eq!(hidden.actual, "1 element(s) matched, none visible");
        assert!(evaluate(&e, &result(vec![element(false, "", &[]), element(true, "", &[])])).holds);
    }

    #[test]
    fn test_contains_text_is_case_sensitive_over_concatenation() {
        let e = expect(Predicate::ContainsText(TextMatch::Substring("San Diego".into())));
        let r = result(vec![element(true, "Based in San ", &[]), element(true, "Diego", &[])]);
        assert!(evaluate(&e, &r).holds);

        let e = expect(Predicate::ContainsText(TextMatch::Substring("san diego".into())));
        let eval = evaluate(&e, &r);
        assert!(!eval.holds);
        assert_eq!(eval.actual, "text \"Based in San Diego\"");
    }

    #[test]
    fn test_count_at_least_is_monotonic() {
        let r = result(vec![element(true, "", &[]); 3]);
        let passes: Vec<bool> = (0..=5)
            .map(|n| evaluate(&expect(Predicate::CountAtLeast(n)), &r).holds)
            .collect();
        assert_eq!(passes, vec![true, true, true, true, false, false]);

        let empty = evaluate(&expect(Predicate::CountAtLeast(1)), &result(vec![]));
        assert!(!empty.holds);
        assert_eq!(empty.actual, "0 element(s)");
    }

    #[test]
    fn test_attribute_equals_exact() {
        let e = expect(Predicate::AttributeEquals {
            name: "alt".into(),
            value: "Let's Car'raoke logo".into(),
        });
        let r = result(vec![
            element(true, "", &[("src", "a.png")]),
            element(true, "", &[("alt", "Let's Car'raoke logo")]),
        ]);
        assert!(evaluate(&e, &r).holds);

        let r = result(vec![element(true, "", &[("alt", "Let's Car'raoke Logo")])]);
        let eval = evaluate(&e, &r);
        assert!(!eval.holds);
        assert_eq!(eval.actual, "alt=\"Let's Car'raoke Logo\"");
    }

    #[test]
    fn test_negation() {
        let e = Expectation {
            predicate: Predicate::Visible,
            negated: true,
        };
        assert!(evaluate(&e, &result(vec![element(false, "", &[])])).holds);
        assert!(!evaluate(&e, &result(vec![element(true, "", &[])])).holds);
    }

    #[test]
    fn test_long_text_is_truncated() {
        let long = "x".repeat(200);
        let eval = evaluate(
            &expect(Predicate::ContainsText(TextMatch::Substring("y".into()))),
            &result(vec![element(true, &long, &[])]),
        );
        assert!(eval.actual.ends_with("…\""));
    }
}
