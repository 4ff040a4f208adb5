//! Shared HTTP plumbing for vendor calls

use reqwest::Response;

use crate::error::{ProviderError, ProviderResult};

/// Turn a non-success vendor response into a structured API error, keeping
/// the body for the log line.
pub(crate) async fn ensure_success(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}
