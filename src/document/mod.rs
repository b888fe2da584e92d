//! Document provider abstraction
//!
//! The engine talks to the page under test only through these two traits.
//! `crate::browser` implements them over the Chrome DevTools Protocol and
//! `fixture` implements them over an in-memory document for tests.

mod element;
pub mod fixture;
pub mod selector;

use async_trait::async_trait;

use crate::common::Result;

pub use element::{ElementHandle, ElementSnapshot, ScrollPosition};
pub use selector::Selector;

/// Source of isolated document sessions
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Open a new session that shares no mutable state with other sessions
    async fn open_session(&self) -> Result<Box<dyn DocumentSession>>;
}

/// One exclusively-owned view of the page under test
#[async_trait]
pub trait DocumentSession: Send {
    /// Load `path`, resolved against the provider's base URL
    async fn navigate(&mut self, path: &str) -> Result<()>;

    /// Every element currently matching `selector`, in document order
    async fn query_selector_all(&mut self, selector: &Selector) -> Result<Vec<ElementSnapshot>>;

    /// Dispatch a synthetic click on a previously queried element
    async fn dispatch_click(&mut self, element: &ElementSnapshot) -> Result<()>;

    async fn scroll_viewport(&mut self, position: ScrollPosition) -> Result<()>;

    /// Release the session
    async fn close(self: Box<Self>) -> Result<()>;
}
