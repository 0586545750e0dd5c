//! Transfer executor
//!
//! Streams one unit from its source into the destination registry. The
//! download body is piped straight into the upload request, so nothing is
//! buffered on disk.

use crate::config::{Credentials, MigrateConfig};
use crate::error::{IoResultExt, MigrateError, Result};
use crate::http::{authorize, ensure_success};
use crate::inventory::{Payload, SourceLocation, TransferUnit};
use crate::registry::Destination;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use std::time::Duration;

/// Report message for units the destination already holds
pub const CONFLICT_MESSAGE: &str = "409 Conflict";

/// Report message for successful units
pub const SUCCESS_MESSAGE: &str = "Succeeded";

/// Result of transferring one unit
#[derive(Debug)]
pub enum TransferOutcome {
    Succeeded,
    /// Not transferred, not a failure (conflict)
    Skipped(String),
    Failed(MigrateError),
}

impl TransferOutcome {
    /// Label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}

/// Moves a single unit
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(&self, unit: &TransferUnit) -> TransferOutcome;
}

/// Attempts and delay for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &MigrateConfig) -> Self {
        Self {
            attempts: config.retries.max(1),
            delay: config.retry_delay,
        }
    }
}

/// How the destination answered an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pushed {
    Created,
    Conflict,
}

/// Download-then-upload over HTTP
pub struct HttpTransfer {
    client: reqwest::Client,
    destination: Destination,
    source_credentials: Option<Credentials>,
    destination_credentials: Option<Credentials>,
    retry: RetryPolicy,
}

impl HttpTransfer {
    pub fn new(client: reqwest::Client, destination: Destination) -> Self {
        Self {
            client,
            destination,
            source_credentials: None,
            destination_credentials: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_source_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.source_credentials = credentials;
        self
    }

    pub fn with_destination_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.destination_credentials = credentials;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Push with retry on network failures
    async fn push(&self, unit: &TransferUnit) -> Result<Pushed> {
        let mut attempt = 1;
        loop {
            match self.try_push(unit).await {
                Err(e) if e.is_transient() && attempt < self.retry.attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        unit.display_name(),
                        attempt,
                        self.retry.attempts,
                        e,
                        self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// One download + upload
    async fn try_push(&self, unit: &TransferUnit) -> Result<Pushed> {
        let body = self.open_source(&unit.source).await?;

        let (url, request) = match &unit.payload {
            Payload::Raw => {
                let url = self.destination.upload_url(&unit.destination_path);
                let request = self.client.put(&url).body(body);
                (url, request)
            }
            Payload::PypiDistribution {
                name,
                version,
                sha256_digest,
                filetype,
            } => {
                let url = self.destination.base_url();
                let content = Part::stream(body).file_name(unit.coordinate.filename().to_string());
                let form = Form::new()
                    .part("content", content)
                    .text("name", name.clone())
                    .text("version", version.clone())
                    .text("sha256_digest", sha256_digest.clone())
                    .text("filetype", filetype.clone());
                let request = self.client.post(&url).multipart(form);
                (url, request)
            }
            Payload::ComposerPackage { version } => {
                let base = self.destination.repository_url();
                let request = self.client.put(base).query(&[("version", version)]).body(body);
                (format!("{}?version={}", base, version), request)
            }
        };

        let response = authorize(request, self.destination_credentials.as_ref())
            .send()
            .await
            .map_err(|e| MigrateError::transport(&url, e))?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(Pushed::Conflict);
        }
        ensure_success(&url, response).await?;
        Ok(Pushed::Created)
    }

    /// Open the source as a streaming request body
    async fn open_source(&self, source: &SourceLocation) -> Result<Body> {
        match source {
            SourceLocation::Local(path) => {
                let file = tokio::fs::File::open(path).await.with_path(path)?;
                Ok(Body::from(file))
            }
            SourceLocation::Remote(url) => {
                let request = authorize(self.client.get(url), self.source_credentials.as_ref());
                let response = request
                    .send()
                    .await
                    .map_err(|e| MigrateError::transport(url, e))?;
                let response = ensure_success(url, response)
                    .await
                    .map_err(|e| e.with_context("Download failed"))?;
                Ok(Body::wrap_stream(response.bytes_stream()))
            }
        }
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn transfer(&self, unit: &TransferUnit) -> TransferOutcome {
        match self.push(unit).await {
            Ok(Pushed::Created) => TransferOutcome::Succeeded,
            Ok(Pushed::Conflict) => {
                tracing::debug!("{} already exists at the destination", unit.destination_path);
                TransferOutcome::Skipped(CONFLICT_MESSAGE.to_string())
            }
            Err(e) => TransferOutcome::Failed(e),
        }
    }
}
