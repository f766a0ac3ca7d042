use crate::base::{DirectLineError, Result};
use std::time::Duration;

/// Create the HTTP client used for every upstream call.
///
/// Without `timeout` the transport default applies.
pub fn create_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| DirectLineError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))
}

/// Read a response body as text, never failing
pub async fn body_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
