//! Common utilities shared by the CLI and the engine

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, FaultKind, Result};

/// Join a suite path onto the base URL
///
/// Absolute `http(s)://` and `about:`/`file:` URLs pass through untouched;
/// everything else is appended to the base with exactly one `/` between.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("about:")
        || path.starts_with("file:")
    {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return format!("{}/", base);
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
