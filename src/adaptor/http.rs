//! Shared HTTP plumbing for the built-in adaptors

use crate::error::{EventLogError, Result};
use std::time::Duration;

/// Build the client every built-in adaptor uses
///
/// A zero timeout leaves reqwest's default (no timeout) in place.
pub(crate) fn build_client(timeout_secs: u64) -> Option<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    match builder.build() {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build HTTP client, adaptor disabled");
            None
        }
    }
}

/// Map a non-2xx response to `EventLogError::Api`
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(EventLogError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}
