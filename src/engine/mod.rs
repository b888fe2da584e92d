//! Assertion engine
//!
//! - [`resolver`] turns targets into element sets
//! - [`evaluator`] checks expectations against them
//! - [`driver`] performs clicks and scrolls
//! - [`poll`] paces retries and honours cancellation
//! - [`runner`] drives whole suites

pub mod driver;
pub mod evaluator;
pub mod poll;
pub mod resolver;
pub mod runner;

pub use evaluator::{evaluate, Evaluation};
pub use poll::PollConfig;
pub use resolver::{resolve, QueryResult};
pub use runner::{Runner, RunnerOptions};
