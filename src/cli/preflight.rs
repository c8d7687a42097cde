//! Target reachability check

use std::time::Duration;

use crate::common::{Error, Result};

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(5);

/// Check that the application under test answers HTTP at `base_url`
///
/// Any HTTP response counts, including error statuses; only connection
/// failures and timeouts are fatal.
pub async fn check_target(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(PREFLIGHT_TIMEOUT)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

    match client.get(base_url).send().await {
        Ok(response) => {
            tracing::debug!(url = base_url, status = %response.status(), "Target reachable");
            Ok(())
        }
        Err(e) => Err(Error::TargetUnreachable {
            url: base_url.to_string(),
            reason: e.to_string(),
        }),
    }
}
