//! Interaction driver: clicks and viewport scrolling

use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::document::{DocumentSession, ElementSnapshot, ScrollPosition};
use crate::suite::Target;

use super::poll::{PollConfig, Poller};
use super::resolver::{resolve, QueryResult};

/// Pick the element a click should land on
///
/// A sole match is used if it is visible; with several matches the first
/// visible one wins.
fn choose(result: &QueryResult) -> std::result::Result<&ElementSnapshot, String> {
    match result.elements.as_slice() {
        [] => Err("no elements matched".to_string()),
        [only] if only.is_visible() => Ok(only),
        [only] => Err(format!("the only match ({}) is not visible", only.describe())),
        many => result
            .first_visible()
            .ok_or_else(|| format!("{} elements matched and none is visible", many.len())),
    }
}

/// Click `target` once it resolves to an unambiguous visible element
///
/// Resolution is retried within the poll window; when it closes without a
/// usable element the step fails with `TargetNotInteractable`.
pub async fn click(
    session: &mut dyn DocumentSession,
    target: &Target,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<ElementSnapshot> {
    let mut poller = Poller::new(config, cancel);
    loop {
        let result = resolve(session, target).await?;
        match choose(&result) {
            Ok(element) => {
                let element = element.clone();
                tracing::debug!(element = %element.describe(), "clicking");
                session.dispatch_click(&element).await?;
                return Ok(element);
            }
            Err(reason) => {
                if !poller.tick().await? {
                    return Err(Error::not_interactable(&result.target, &reason));
                }
            }
        }
    }
}

/// Move the viewport; effects are observed by later steps
pub async fn scroll_to(session: &mut dyn DocumentSession, position: ScrollPosition) -> Result<()> {
    tracing::debug!(%position, "scrolling");
    session.scroll_viewport(position).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixture::{FixtureNode, FixturePage, FixtureProvider};
    use crate::document::{DocumentProvider, Selector};
    use std::time::Duration;

    fn target(css: &str) -> Target {
        Target {
            selector: Some(Selector::parse(css).unwrap()),
            text: None,
            within: None,
        }
    }

    fn quick() -> PollConfig {
        PollConfig {
            timeout: Duration::from_millis(100),
            interval: Duration::from_millis(20),
        }
    }

    fn provider() -> FixtureProvider {
        FixtureProvider::new().with_page(
            "/",
            FixturePage::new([
                FixtureNode::new("button").class("cta").hidden().text("Hidden"),
                FixtureNode::new("button").class("cta").text("Book Now"),
                FixtureNode::new("button").id("ghost").hidden().text("Ghost"),
            ]),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_first_visible_match() {
        let provider = provider();
        let mut session = provider.open_session().await.unwrap();
        session.navigate("/").await.unwrap();

        let cancel = CancellationToken::new();
        let clicked = click(session.as_mut(), &target("button.cta"), quick(), &cancel)
            .await
            .unwrap();
        assert_eq!(clicked.text_content(), "Book Now");
        assert_eq!(provider.clicks(), vec!["button.cta".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_missing_or_hidden_target() {
        let provider = provider();
        let mut session = provider.open_session().await.unwrap();
        session.navigate("/").await.unwrap();
        let cancel = CancellationToken::new();

        let err = click(session.as_mut(), &target("#nope"), quick(), &cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no elements matched"), "{}", err);

        let err = click(session.as_mut(), &target("#ghost"), quick(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotInteractable { .. }));
        assert!(err.to_string().contains("not visible"));
        assert!(provider.clicks().is_empty());
    }
}
