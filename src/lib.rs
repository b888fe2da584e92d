//! pagecheck - a small browser-driven assertion engine
//!
//! Suites of scenarios are loaded from YAML ([`suite`]), executed step by
//! step by the [`engine`] against a [`document::DocumentProvider`], and
//! reported through [`report`] sinks. [`browser`] provides the Chromium
//! provider; [`document::fixture`] an in-memory one for tests.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod common;
pub mod document;
pub mod engine;
pub mod preflight;
pub mod report;
pub mod suite;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{Runner, RunnerOptions};
pub use report::{Report, ReportSink};
pub use suite::Suite;
