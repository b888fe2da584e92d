//! Test suites
//!
//! Suites are YAML files of named scenarios. [`config`] holds the file
//! format; [`model`] holds the validated form the engine runs.

pub mod config;
pub mod model;

pub use model::{Expectation, Predicate, Scenario, Step, Suite, Target, TextMatch, WaitCondition};
