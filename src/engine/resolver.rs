//! Query resolution
//!
//! Turns a step's [`Target`] into the elements currently matching it.
//! Nothing is cached: every call goes back to the document, since clicks
//! and scrolls change the page between steps.

use crate::common::Result;
use crate::document::{DocumentSession, ElementSnapshot, Selector};
use crate::suite::Target;

/// Elements that never carry page content for text-only queries
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "head", "title", "noscript", "template"];

/// Elements matched by one resolution, in document order
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Description of the target, for outcomes and errors
    pub target: String,
    pub elements: Vec<ElementSnapshot>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn first_visible(&self) -> Option<&ElementSnapshot> {
        self.elements.iter().find(|e| e.is_visible())
    }

    pub fn visible_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_visible()).count()
    }

    /// Text content of all matches joined in document order
    pub fn concatenated_text(&self) -> String {
        self.elements.iter().map(|e| e.text_content()).collect()
    }
}

/// The structural selector sent to the document for `target`
fn structural_selector(target: &Target) -> Result<Selector> {
    match (&target.selector, &target.within) {
        (Some(selector), Some(scope)) => Ok(selector.within(scope)),
        (Some(selector), None) => Ok(selector.clone()),
        (None, Some(scope)) => Ok(Selector::universal().within(scope)),
        (None, None) => Selector::parse("body *"),
    }
}

/// Resolve `target` against the session's current document
///
/// An empty result is not an error. With a text filter and no selector
/// only the deepest matching elements are kept, so `contains: "Book Now"`
/// yields the button rather than every ancestor of it.
pub async fn resolve(session: &mut dyn DocumentSession, target: &Target) -> Result<QueryResult> {
    let selector = structural_selector(target)?;
    let mut elements = session.query_selector_all(&selector).await?;

    if let Some(text) = &target.text {
        elements.retain(|e| text.is_match(e.text_content()));

        if target.selector.is_none() {
            elements.retain(|e| !NON_CONTENT_TAGS.contains(&e.tag.as_str()));
            let deepest: Vec<ElementSnapshot> = elements
                .iter()
                .filter(|e| !elements.iter().any(|other| e.is_ancestor_of(other)))
                .cloned()
                .collect();
            elements = deepest;
        }
    }

    tracing::trace!(query = %target, matched = elements.len(), "resolved");
    Ok(QueryResult {
        target: target.to_string(),
        elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixture::{FixtureNode, FixturePage, FixtureProvider};
    use crate::document::DocumentProvider;
    use crate::suite::TextMatch;
    use regex::Regex;

    async fn session() -> Box<dyn DocumentSession> {
        let page = FixturePage::new([
            FixtureNode::new("nav").children([
                FixtureNode::new("a").attr("href", "#how").text("How it works"),
                FixtureNode::new("a").attr("href", "#faq").text("FAQ"),
            ]),
            FixtureNode::new("main").children([
                FixtureNode::new("section")
                    .child(FixtureNode::new("h3").text("Pick a Time"))
                    .child(FixtureNode::new("button").class("cta").text("Book Now")),
                FixtureNode::new("section").child(FixtureNode::new("p").text("Book Now")),
            ]),
            FixtureNode::new("script").text("var Book Now"),
        ]);
        let provider = FixtureProvider::new().with_page("/", page);
        let mut session = provider.open_session().await.unwrap();
        session.navigate("/").await.unwrap();
        session
    }

    fn target(selector: Option<&str>, text: Option<TextMatch>, within: Option<&str>) -> Target {
        Target {
            selector: selector.map(|s| Selector::parse(s).unwrap()),
            text,
            within: within.map(|s| Selector::parse(s).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_attribute_and_descendant() {
        let mut session = session().await;
        let result = resolve(session.as_mut(), &target(Some(r##"nav a[href="#how"]"##), None, None))
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.elements[0].text_content(), "How it works");
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let mut session = session().await;
        let result = resolve(session.as_mut(), &target(Some("button.missing"), None, None))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.target, "button.missing");
    }

    #[tokio::test]
    async fn test_text_only_keeps_deepest_content_elements() {
        let mut session = session().await;
        let result = resolve(
            session.as_mut(),
            &target(None, Some(TextMatch::Substring("Book Now".into())), None),
        )
        .await
        .unwrap();
        let tags: Vec<&str> = result.elements.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["button", "p"]);
    }

    #[tokio::test]
    async fn test_selector_with_text_and_scope() {
        let mut session = session().await;
        let result = resolve(
            session.as_mut(),
            &target(
                Some("section"),
                Some(TextMatch::Pattern(Regex::new("Pick a \\w+").unwrap())),
                Some("main"),
            ),
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 1);

        let scoped = resolve(session.as_mut(), &target(None, Some(TextMatch::Substring("FAQ".into())), Some("main")))
            .await
            .unwrap();
        assert!(scoped.is_empty());
    }

    #[tokio::test]
    async fn test_concatenated_text() {
        let mut session = session().await;
        let result = resolve(session.as_mut(), &target(Some("nav a"), None, None))
            .await
            .unwrap();
        assert_eq!(result.concatenated_text(), "How it worksFAQ");
    }
}
