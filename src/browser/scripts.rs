//! JavaScript evaluated in the page
//!
//! Selector strings are embedded as JSON string literals, never spliced in
//! raw.

use crate::common::Result;
use crate::document::ScrollPosition;

/// Snapshot every match of a selector
///
/// Visibility follows the usual "is it rendered" rules: no `display: none`
/// on the element or an ancestor, not `visibility: hidden`, not fully
/// transparent, and a non-empty layout box.
const QUERY: &str = r#"(() => {
  const selector = __SELECTOR__;
  const hiddenByStyle = (el) => {
    const style = window.getComputedStyle(el);
    return style.display === 'none'
      || style.visibility === 'hidden'
      || style.visibility === 'collapse'
      || parseFloat(style.opacity) === 0;
  };
  const isVisible = (el) => {
    if (hiddenByStyle(el)) return false;
    for (let p = el.parentElement; p; p = p.parentElement) {
      const style = window.getComputedStyle(p);
      if (style.display === 'none' || parseFloat(style.opacity) === 0) return false;
    }
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0 && el.getClientRects().length > 0;
  };
  const pathOf = (el) => {
    const path = [];
    for (let node = el; node.parentElement; node = node.parentElement) {
      path.unshift(Array.prototype.indexOf.call(node.parentElement.children, node));
    }
    return path;
  };
  return Array.from(document.querySelectorAll(selector)).map((el) => ({
    tag: el.tagName.toLowerCase(),
    visible: isVisible(el),
    text: el.textContent || '',
    attributes: Object.fromEntries(Array.from(el.attributes).map((a) => [a.name, a.value])),
    path: pathOf(el),
  }));
})()"#;

/// Scroll a match into view and click it; `false` if it is gone
const CLICK: &str = r#"(() => {
  const el = document.querySelectorAll(__SELECTOR__)[__INDEX__];
  if (!el) return false;
  el.scrollIntoView({ block: 'center', inline: 'center' });
  el.click();
  return true;
})()"#;

/// HTTP status of the current document, 0 when unknown
pub const RESPONSE_STATUS: &str = r#"(() => {
  const entry = performance.getEntriesByType('navigation')[0];
  return entry && entry.responseStatus ? entry.responseStatus : 0;
})()"#;

fn literal(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn query(selector: &str) -> Result<String> {
    Ok(QUERY.replace("__SELECTOR__", &literal(selector)?))
}

pub fn click(selector: &str, index: usize) -> Result<String> {
    Ok(CLICK
        .replace("__SELECTOR__", &literal(selector)?)
        .replace("__INDEX__", &index.to_string()))
}

pub fn scroll(position: ScrollPosition) -> String {
    match position {
        ScrollPosition::Top => "window.scrollTo(0, 0); true".to_string(),
        ScrollPosition::Bottom => {
            "window.scrollTo(0, document.documentElement.scrollHeight); true".to_string()
        }
        ScrollPosition::Coordinate { x, y } => format!("window.scrollTo({}, {}); true", x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_is_quoted() {
        let script = query(r##"a[href="#how"]"##).unwrap();
        assert!(script.contains(r##"const selector = "a[href=\"#how\"]";"##));
        assert!(!script.contains("__SELECTOR__"));
    }

    #[test]
    fn test_click_script() {
        let script = click("button.cta", 2).unwrap();
        assert!(script.contains(r#"document.querySelectorAll("button.cta")[2]"#));
    }

    #[test]
    fn test_scroll_script() {
        assert_eq!(
            scroll(ScrollPosition::Coordinate { x: 0, y: 600 }),
            "window.scrollTo(0, 600); true"
        );
    }
}
