//! In-memory document provider
//!
//! Serves hand-built pages without a browser so the engine can be exercised
//! deterministically. It models just enough page behaviour for smoke suites:
//!
//! - elements are visible unless hidden by themselves or an ancestor, and
//!   have a rendered box (height, text, a replaced element, or a child with
//!   a box)
//! - `reveal_on_target` behaves like CSS `:target` styling
//! - `reveal_after_scroll` turns visible only once the viewport has scrolled
//!   far enough *and* a settle delay has passed, like a scroll-triggered
//!   transition
//! - clicking an in-page anchor (`href="#id"`) sets the fragment and scrolls
//!   the target into view; `toggles` flips another element's hidden flag
//!
//! Layout is a single column: each element's `height` stacks in document
//! order, so heights belong on leaf blocks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::common::{Error, Result};

use super::selector::ElementLike;
use super::{DocumentProvider, DocumentSession, ElementHandle, ElementSnapshot, ScrollPosition, Selector};

const REPLACED_TAGS: &[&str] = &["img", "input", "video", "iframe", "canvas", "svg", "textarea"];

/// When an element is allowed to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Always,
    /// Only while the URL fragment names this element's id
    OnTarget,
    /// Once `scroll_y >= min_scroll_y` and `settle` has elapsed since the scroll
    AfterScroll { min_scroll_y: u32, settle: Duration },
}

/// Builder for one element of a fixture page
#[derive(Debug, Clone)]
pub struct FixtureNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<FixtureNode>,
    height: u32,
    hidden: bool,
    reveal: Reveal,
    toggles: Option<String>,
}

impl FixtureNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            height: 0,
            hidden: false,
            reveal: Reveal::Always,
            toggles: None,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    /// Text placed before the children
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn child(mut self, child: FixtureNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = FixtureNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Hidden by styling (`display: none`)
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn reveal_on_target(mut self) -> Self {
        self.reveal = Reveal::OnTarget;
        self
    }

    pub fn reveal_after_scroll(mut self, min_scroll_y: u32, settle: Duration) -> Self {
        self.reveal = Reveal::AfterScroll {
            min_scroll_y,
            settle,
        };
        self
    }

    /// Clicking this element flips the hidden flag of the element with `id`
    pub fn toggles(mut self, id: &str) -> Self {
        self.toggles = Some(id.to_string());
        self
    }
}

/// A complete fixture page
#[derive(Debug, Clone)]
pub struct FixturePage {
    root: FixtureNode,
}

impl FixturePage {
    /// Wrap body content in `html > (head, body)`
    pub fn new(body: impl IntoIterator<Item = FixtureNode>) -> Self {
        let root = FixtureNode::new("html")
            .child(FixtureNode::new("head").child(FixtureNode::new("title").text("fixture")))
            .child(FixtureNode::new("body").children(body));
        Self { root }
    }

    /// Use `root` as the document element as-is
    pub fn from_root(root: FixtureNode) -> Self {
        Self { root }
    }
}

/// Provider serving fixture pages by path
pub struct FixtureProvider {
    pages: HashMap<String, FixturePage>,
    viewport_height: u32,
    max_sessions: Option<usize>,
    sessions_opened: AtomicUsize,
    disconnected: Arc<AtomicBool>,
    clicks: Arc<Mutex<Vec<String>>>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            viewport_height: 720,
            max_sessions: None,
            sessions_opened: AtomicUsize::new(0),
            disconnected: Arc::new(AtomicBool::new(false)),
            clicks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_page(mut self, path: &str, page: FixturePage) -> Self {
        self.pages.insert(path.to_string(), page);
        self
    }

    pub fn with_viewport_height(mut self, height: u32) -> Self {
        self.viewport_height = height;
        self
    }

    /// Simulate losing the provider once `n` sessions have been opened
    pub fn disconnect_after_sessions(mut self, n: usize) -> Self {
        self.max_sessions = Some(n);
        self
    }

    /// Drop the connection for every session immediately
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Description of every clicked element, across sessions
    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentProvider for FixtureProvider {
    async fn open_session(&self) -> Result<Box<dyn DocumentSession>> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(Error::ProviderDisconnected("fixture provider disconnected".into()));
        }
        let opened = self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.max_sessions {
            if opened >= max {
                self.disconnected.store(true, Ordering::SeqCst);
                return Err(Error::ProviderDisconnected(format!(
                    "fixture provider dropped after {} sessions",
                    max
                )));
            }
        }
        Ok(Box::new(FixtureSession {
            pages: self.pages.clone(),
            viewport_height: self.viewport_height,
            document: None,
            disconnected: Arc::clone(&self.disconnected),
            clicks: Arc::clone(&self.clicks),
        }))
    }
}

/// Flattened element with resolved layout
#[derive(Debug, Clone)]
struct ArenaNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<usize>,
    parent: Option<usize>,
    path: Vec<u32>,
    offset_y: u32,
    height: u32,
    hidden: bool,
    reveal: Reveal,
    toggles: Option<String>,
}

impl ElementLike for ArenaNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Live state of one loaded page
struct LoadedDocument {
    nodes: Vec<ArenaNode>,
    document_height: u32,
    scroll_y: u32,
    scrolled_at: Option<Instant>,
    fragment: Option<String>,
}

impl LoadedDocument {
    fn load(page: &FixturePage, fragment: Option<String>) -> Self {
        let mut nodes = Vec::new();
        let mut offset = 0;
        flatten(&page.root, None, Vec::new(), &mut offset, &mut nodes);

        let mut doc = Self {
            nodes,
            document_height: offset,
            scroll_y: 0,
            scrolled_at: None,
            fragment: None,
        };
        if let Some(fragment) = fragment {
            doc.go_to_fragment(&fragment);
        }
        doc
    }

    fn max_scroll(&self, viewport_height: u32) -> u32 {
        self.document_height.saturating_sub(viewport_height)
    }

    fn scroll_to(&mut self, y: u32) {
        self.scroll_y = y;
        self.scrolled_at = Some(Instant::now());
    }

    fn find_by_id(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.attr("id") == Some(id))
    }

    fn go_to_fragment(&mut self, fragment: &str) {
        self.fragment = Some(fragment.to_string());
        if let Some(target) = self.find_by_id(fragment) {
            let y = self.nodes[target].offset_y;
            self.scroll_to(y);
        }
    }

    fn chain(&self, index: usize) -> Vec<&ArenaNode> {
        let mut chain = vec![&self.nodes[index]];
        let mut current = self.nodes[index].parent;
        while let Some(parent) = current {
            chain.push(&self.nodes[parent]);
            current = self.nodes[parent].parent;
        }
        chain
    }

    fn text_content(&self, index: usize) -> String {
        let node = &self.nodes[index];
        let mut text = node.text.clone();
        for &child in &node.children {
            text.push_str(&self.text_content(child));
        }
        text
    }

    fn has_box(&self, index: usize) -> bool {
        let node = &self.nodes[index];
        node.height > 0
            || REPLACED_TAGS.contains(&node.tag.as_str())
            || !node.text.trim().is_empty()
            || node.children.iter().any(|&c| self.has_box(c))
    }

    fn passes_reveal(&self, node: &ArenaNode) -> bool {
        match node.reveal {
            Reveal::Always => true,
            Reveal::OnTarget => match (&self.fragment, node.attr("id")) {
                (Some(fragment), Some(id)) => fragment == id,
                _ => false,
            },
            Reveal::AfterScroll {
                min_scroll_y,
                settle,
            } => {
                self.scroll_y >= min_scroll_y
                    && self
                        .scrolled_at
                        .map(|at| at.elapsed() >= settle)
                        .unwrap_or(false)
            }
        }
    }

    fn is_visible(&self, index: usize) -> bool {
        let chain = self.chain(index);
        if chain.iter().any(|n| n.hidden || !self.passes_reveal(n)) {
            return false;
        }
        self.has_box(index)
    }

    fn snapshot(&self, index: usize, handle: ElementHandle) -> ElementSnapshot {
        let node = &self.nodes[index];
        ElementSnapshot {
            handle,
            tag: node.tag.clone(),
            visible: self.is_visible(index),
            text: self.text_content(index),
            attributes: node.attributes.clone(),
            path: node.path.clone(),
        }
    }
}

fn flatten(
    node: &FixtureNode,
    parent: Option<usize>,
    path: Vec<u32>,
    offset: &mut u32,
    out: &mut Vec<ArenaNode>,
) -> usize {
    let index = out.len();
    out.push(ArenaNode {
        tag: node.tag.clone(),
        attributes: node.attributes.clone(),
        text: node.text.clone(),
        children: Vec::new(),
        parent,
        path: path.clone(),
        offset_y: *offset,
        height: node.height,
        hidden: node.hidden,
        reveal: node.reveal,
        toggles: node.toggles.clone(),
    });
    *offset += node.height;

    let mut children = Vec::with_capacity(node.children.len());
    for (i, child) in node.children.iter().enumerate() {
        let mut child_path = path.clone();
        child_path.push(i as u32);
        children.push(flatten(child, Some(index), child_path, offset, out));
    }
    out[index].children = children;
    index
}

/// Session over one provider's pages
pub struct FixtureSession {
    pages: HashMap<String, FixturePage>,
    viewport_height: u32,
    document: Option<LoadedDocument>,
    disconnected: Arc<AtomicBool>,
    clicks: Arc<Mutex<Vec<String>>>,
}

impl FixtureSession {
    fn check_connected(&self) -> Result<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(Error::ProviderDisconnected("fixture provider disconnected".into()));
        }
        Ok(())
    }

    fn document(&mut self) -> Result<&mut LoadedDocument> {
        self.document
            .as_mut()
            .ok_or_else(|| Error::ProviderCommunication("no page loaded; navigate first".into()))
    }
}

#[async_trait]
impl DocumentSession for FixtureSession {
    async fn navigate(&mut self, path: &str) -> Result<()> {
        self.check_connected()?;
        let (page_path, fragment) = match path.split_once('#') {
            Some((p, f)) => (p, Some(f.to_string())),
            None => (path, None),
        };
        let page_path = if page_path.is_empty() { "/" } else { page_path };

        let page = self
            .pages
            .get(page_path)
            .ok_or_else(|| Error::navigation_failed(path, "404 Not Found"))?;
        self.document = Some(LoadedDocument::load(page, fragment));
        tracing::trace!(path, "fixture page loaded");
        Ok(())
    }

    async fn query_selector_all(&mut self, selector: &Selector) -> Result<Vec<ElementSnapshot>> {
        self.check_connected()?;
        let css = selector.to_string();
        let doc = self.document()?;

        let matched: Vec<usize> = (0..doc.nodes.len())
            .filter(|&i| selector.matches_chain(&doc.chain(i)))
            .collect();

        Ok(matched
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                doc.snapshot(
                    node,
                    ElementHandle {
                        selector: css.clone(),
                        index,
                    },
                )
            })
            .collect())
    }

    async fn dispatch_click(&mut self, element: &ElementSnapshot) -> Result<()> {
        self.check_connected()?;
        let description = element.describe();
        let doc = self.document()?;

        let index = doc
            .nodes
            .iter()
            .position(|n| n.path == element.path)
            .ok_or_else(|| {
                Error::ProviderCommunication(format!("element {} is detached", description))
            })?;

        let href = doc.nodes[index].attr("href").map(str::to_string);
        let toggles = doc.nodes[index].toggles.clone();

        if let Some(fragment) = href.as_deref().and_then(|h| h.strip_prefix('#')) {
            doc.go_to_fragment(fragment);
        }
        if let Some(id) = toggles {
            if let Some(target) = doc.find_by_id(&id) {
                doc.nodes[target].hidden = !doc.nodes[target].hidden;
            }
        }

        if let Ok(mut clicks) = self.clicks.lock() {
            clicks.push(description);
        }
        Ok(())
    }

    async fn scroll_viewport(&mut self, position: ScrollPosition) -> Result<()> {
        self.check_connected()?;
        let viewport_height = self.viewport_height;
        let doc = self.document()?;
        let max = doc.max_scroll(viewport_height);
        let y = match position {
            ScrollPosition::Top => 0,
            ScrollPosition::Bottom => max,
            ScrollPosition::Coordinate { y, .. } => y.clamp(0, max as i64) as u32,
        };
        doc.scroll_to(y);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> FixturePage {
        FixturePage::new([
            FixtureNode::new("header")
                .height(80)
                .child(FixtureNode::new("nav").child(FixtureNode::new("a").attr("href", "#how").text("How"))),
            FixtureNode::new("section").id("hero").height(600).text("Hero"),
            FixtureNode::new("section")
                .id("how")
                .height(400)
                .reveal_on_target()
                .child(FixtureNode::new("h3").text("Pick a Time")),
            FixtureNode::new("div").class("empty"),
            FixtureNode::new("button").id("menu").text("Menu").toggles("drawer"),
            FixtureNode::new("aside").id("drawer").hidden().text("Links"),
            FixtureNode::new("div")
                .class("late")
                .text("Late")
                .reveal_after_scroll(100, Duration::from_millis(0)),
        ])
    }

    async fn session() -> Box<dyn DocumentSession> {
        let provider = FixtureProvider::new().with_page("/", page());
        let mut session = provider.open_session().await.unwrap();
        session.navigate("/").await.unwrap();
        session
    }

    async fn query(session: &mut Box<dyn DocumentSession>, css: &str) -> Vec<ElementSnapshot> {
        session
            .query_selector_all(&Selector::parse(css).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_in_document_order() {
        let mut session = session().await;
        let sections = query(&mut session, "body section").await;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].attribute("id"), Some("hero"));
        assert_eq!(sections[1].handle.index, 1);
        assert_eq!(sections[1].text_content(), "Pick a Time");
    }

    #[tokio::test]
    async fn test_visibility_rules() {
        let mut session = session().await;
        assert!(query(&mut session, "header").await[0].is_visible());
        assert!(!query(&mut session, "div.empty").await[0].is_visible());
        assert!(!query(&mut session, "#drawer").await[0].is_visible());
        assert!(!query(&mut session, "#how h3").await[0].is_visible());
    }

    #[tokio::test]
    async fn test_anchor_click_targets_section() {
        let mut session = session().await;
        let link = query(&mut session, r##"nav a[href="#how"]"##).await.remove(0);
        session.dispatch_click(&link).await.unwrap();
        assert!(query(&mut session, "#how").await[0].is_visible());
    }

    #[tokio::test]
    async fn test_toggle_click() {
        let mut session = session().await;
        let menu = query(&mut session, "#menu").await.remove(0);
        session.dispatch_click(&menu).await.unwrap();
        assert!(query(&mut session, "#drawer").await[0].is_visible());
    }

    #[tokio::test]
    async fn test_scroll_reveal_and_navigation_reset() {
        let mut session = session().await;
        assert!(!query(&mut session, ".late").await[0].is_visible());
        session.scroll_viewport(ScrollPosition::Bottom).await.unwrap();
        assert!(query(&mut session, ".late").await[0].is_visible());

        session.navigate("/").await.unwrap();
        assert!(!query(&mut session, ".late").await[0].is_visible());
    }

    #[tokio::test]
    async fn test_navigate_with_fragment_and_unknown_path() {
        let mut session = session().await;
        session.navigate("/#how").await.unwrap();
        assert!(query(&mut session, "#how").await[0].is_visible());

        let err = session.navigate("/missing").await.unwrap_err();
        assert!(matches!(err, Error::NavigationFailed { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_fails_every_operation() {
        let provider = FixtureProvider::new()
            .with_page("/", page())
            .disconnect_after_sessions(1);
        let mut session = provider.open_session().await.unwrap();
        session.navigate("/").await.unwrap();

        assert!(matches!(
            provider.open_session().await.err(),
            Some(Error::ProviderDisconnected(_))
        ));
        assert!(matches!(
            session.navigate("/").await,
            Err(Error::ProviderDisconnected(_))
        ));
    }
}
