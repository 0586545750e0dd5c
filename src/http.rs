//! Shared HTTP plumbing
//!
//! One `reqwest::Client` is built per run and shared by the listing
//! adapters, the existence oracle and the transfer workers.

use crate::config::{Credentials, MigrateConfig};
use crate::error::{MigrateError, Result};
use reqwest::{RequestBuilder, Response};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("artifact-migrate/", env!("CARGO_PKG_VERSION"));

/// Build the client for a run
pub fn build_client(config: &MigrateConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| MigrateError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Attach basic auth when credentials are present
pub fn authorize(request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    match credentials {
        Some(c) => request.basic_auth(&c.username, Some(&c.password)),
        None => request,
    }
}

/// Turn a non-2xx response into `UnexpectedStatus`, keeping a body excerpt
pub async fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MigrateError::UnexpectedStatus {
        url: url.to_string(),
        status: status.as_u16(),
        body: excerpt(&body),
    })
}

/// First few hundred characters of a response body
pub fn excerpt(body: &str) -> String {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.trim().to_string(),
    }
}
