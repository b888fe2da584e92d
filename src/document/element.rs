//! Element snapshots returned by document providers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies an element for a follow-up interaction
///
/// The `index`-th match of `selector` at the time of the query. Providers
/// re-resolve the pair when dispatching, so a handle is only meaningful
/// right after the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub selector: String,
    pub index: usize,
}

/// Point-in-time view of one matched element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    /// Lowercase tag name
    pub tag: String,
    pub visible: bool,
    /// `textContent` of the element
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Child indices from the document root down to this element
    pub path: Vec<u32>,
}

impl ElementSnapshot {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text_content(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether `other` sits somewhere below this element
    pub fn is_ancestor_of(&self, other: &ElementSnapshot) -> bool {
        other.path.len() > self.path.len() && other.path.starts_with(&self.path)
    }

    /// Short human-readable description, e.g. `button.cta#book`
    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        if let Some(id) = self.attribute("id") {
            out.push('#');
            out.push_str(id);
        }
        if let Some(classes) = self.attribute("class") {
            for class in classes.split_whitespace() {
                out.push('.');
                out.push_str(class);
            }
        }
        out
    }
}

/// Where `scroll_viewport` should move the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPosition {
    Top,
    Bottom,
    Coordinate { x: i64, y: i64 },
}

impl std::fmt::Display for ScrollPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrollPosition::Top => f.write_str("top"),
            ScrollPosition::Bottom => f.write_str("bottom"),
            ScrollPosition::Coordinate { x, y } => write!(f, "({}, {})", x, y),
        }
    }
}
