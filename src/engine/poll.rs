//! Bounded polling with cancellation

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};

/// Poll window for one assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(4000),
            interval: Duration::from_millis(50),
        }
    }
}

impl PollConfig {
    /// Same interval with a step-specific timeout, if one is given
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        Self {
            timeout: timeout.unwrap_or(self.timeout),
            ..self
        }
    }
}

/// Paces the attempts of one poll
///
/// The caller evaluates, then calls [`Poller::tick`]; `tick` sleeps until
/// the next attempt is due and returns `false` once the deadline has passed.
/// The last sleep is cut short at the deadline, so a final attempt always
/// runs there and a poll never outlasts `timeout` plus one attempt.
pub struct Poller<'a> {
    deadline: Instant,
    interval: Duration,
    attempts: u32,
    cancel: &'a CancellationToken,
}

impl<'a> Poller<'a> {
    pub fn new(config: PollConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + config.timeout,
            interval: config.interval.max(Duration::from_millis(1)),
            attempts: 1,
            cancel,
        }
    }

    /// Number of attempts made so far, counting the current one
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait for the next attempt
    ///
    /// Returns `Ok(false)` when the window is closed and
    /// `Err(Error::Cancelled)` as soon as the token fires.
    pub async fn tick(&mut self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let now = Instant::now();
        if now >= self.deadline {
            return Ok(false);
        }
        let wait = self.interval.min(self.deadline - now);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }

        self.attempts += 1;
        tracing::trace!(attempt = self.attempts, "retrying");
        Ok(true)
    }
}

/// Sleep for `duration` unless cancelled first
pub async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
