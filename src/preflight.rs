//! Base URL reachability check

use std::time::Duration;

use crate::common::{Error, Result};

/// Make sure something answers HTTP at `base_url`
///
/// Any response counts, including error statuses; only connection
/// failures and timeouts are reported.
pub async fn check_base_url(base_url: &str, timeout: Duration) -> Result<()> {
    let unreachable = |reason: String| Error::BaseUrlUnreachable {
        url: base_url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| unreachable(e.to_string()))?;

    let response = client.get(base_url).send().await.map_err(|e| {
        if e.is_timeout() {
            unreachable(format!("no response within {}s", timeout.as_secs()))
        } else if e.is_connect() {
            unreachable("connection refused".to_string())
        } else {
            unreachable(e.to_string())
        }
    })?;

    tracing::debug!(url = base_url, status = %response.status(), "base URL reachable");
    Ok(())
}
