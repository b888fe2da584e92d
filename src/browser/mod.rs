//! Chromium document provider
//!
//! Drives a real browser over the Chrome DevTools Protocol. Queries,
//! visibility checks and clicks run as small scripts in the page; see
//! [`scripts`].

mod launcher;
mod scripts;
mod session;

pub use launcher::CdpProvider;
pub use session::CdpSession;
