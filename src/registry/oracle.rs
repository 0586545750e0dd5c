//! Existence oracle
//!
//! Two paginated open API queries tell what the destination already holds:
//! `DescribeTeamArtifacts` lists package versions page by page and
//! `DescribeArtifactRepositoryFileList` lists file paths behind a
//! continuation token. A business error on any page fails the whole query;
//! a partial answer is never returned.

use crate::config::Credentials;
use crate::error::{MigrateError, Result};
use crate::http::{authorize, ensure_success};
use crate::inventory::ExistenceSet;
use crate::kind::ArtifactKind;
use crate::registry::Destination;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Records requested per page
pub const PAGE_SIZE: usize = 1000;

const DESCRIBE_ARTIFACTS: &str = "DescribeTeamArtifacts";
const DESCRIBE_FILES: &str = "DescribeArtifactRepositoryFileList";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeArtifactsRequest<'a> {
    action: &'a str,
    page_number: usize,
    page_size: usize,
    rule: ArtifactRule<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ArtifactRule<'a> {
    project_name: [&'a str; 1],
    repository: [&'a str; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeFilesRequest<'a> {
    action: &'a str,
    project: &'a str,
    repository: &'a str,
    page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    continuation_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<D> {
    response: ResponseBody<D>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseBody<D> {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
    data: Option<D>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArtifactPage {
    #[serde(default)]
    instance_set: Vec<ArtifactRecord>,
    #[serde(default)]
    total_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArtifactRecord {
    package: String,
    package_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FilePage {
    #[serde(default)]
    instance_set: Vec<FileRecord>,
    #[serde(default)]
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileRecord {
    path: String,
}

/// Answers "does the destination already have X"
pub struct ExistenceOracle {
    client: reqwest::Client,
    destination: Destination,
    credentials: Credentials,
    page_size: usize,
}

impl ExistenceOracle {
    pub fn new(client: reqwest::Client, destination: Destination, credentials: Credentials) -> Self {
        Self {
            client,
            destination,
            credentials,
            page_size: PAGE_SIZE,
        }
    }

    /// Override the page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Every `package:version` the destination repository holds
    pub async fn fetch_existing(&self) -> Result<HashSet<String>> {
        let mut keys = HashSet::new();
        let mut page_number = 1;

        loop {
            let request = DescribeArtifactsRequest {
                action: DESCRIBE_ARTIFACTS,
                page_number,
                page_size: self.page_size,
                rule: ArtifactRule {
                    project_name: [self.destination.project.as_str()],
                    repository: [self.destination.repository.as_str()],
                },
            };
            let page: ArtifactPage = self.call(DESCRIBE_ARTIFACTS, &request).await?;
            tracing::debug!(
                "Existing artifacts page {} ({} records, total {})",
                page_number,
                page.instance_set.len(),
                page.total_count
            );

            let empty = page.instance_set.is_empty();
            keys.extend(
                page.instance_set
                    .into_iter()
                    .map(|a| format!("{}:{}", a.package, a.package_version)),
            );

            if empty || page_number * self.page_size >= page.total_count {
                break;
            }
            page_number += 1;
        }

        Ok(keys)
    }

    /// Every file path the destination repository holds
    pub async fn fetch_existing_files(&self) -> Result<HashSet<String>> {
        let mut paths = HashSet::new();
        let mut token: Option<String> = None;
        let mut pages = 0;

        loop {
            let request = DescribeFilesRequest {
                action: DESCRIBE_FILES,
                project: &self.destination.project,
                repository: &self.destination.repository,
                page_size: self.page_size,
                continuation_token: token.as_deref(),
            };
            let page: FilePage = self.call(DESCRIBE_FILES, &request).await?;
            pages += 1;
            tracing::debug!("Existing files page {} ({} records)", pages, page.instance_set.len());

            paths.extend(
                page.instance_set
                    .into_iter()
                    .map(|f| f.path.trim_start_matches('/').to_string()),
            );

            match page.continuation_token.filter(|t| !t.trim().is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(paths)
    }

    /// Build the existence set a kind needs
    pub async fn fetch(&self, kind: &dyn ArtifactKind) -> Result<ExistenceSet> {
        let files = if kind.uses_file_existence() {
            self.fetch_existing_files()
                .await
                .map_err(|e| e.with_context("Failed to find files in the destination repository"))?
        } else {
            HashSet::new()
        };
        let versions = self
            .fetch_existing()
            .await
            .map_err(|e| e.with_context("Failed to find artifacts in the destination repository"))?;

        tracing::info!(
            "Destination holds {} versions and {} files",
            versions.len(),
            files.len()
        );
        Ok(ExistenceSet::new(versions, files))
    }

    async fn call<R, D>(&self, action: &str, request: &R) -> Result<D>
    where
        R: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let url = self.destination.open_api_url();
        let request = self.client.post(&url).json(request);
        let response = authorize(request, Some(&self.credentials))
            .send()
            .await
            .map_err(|e| MigrateError::transport(&url, e))?;
        let body = ensure_success(&url, response)
            .await?
            .text()
            .await
            .map_err(|e| MigrateError::transport(&url, e))?;

        let envelope: Envelope<D> = serde_json::from_str(&body).map_err(|e| MigrateError::decode(&url, e))?;
        let response = envelope.response;
        if let Some(error) = response.error {
            tracing::debug!("{} failed, request id {:?}", action, response.request_id);
            return Err(MigrateError::Remote {
                action: action.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        response
            .data
            .ok_or_else(|| MigrateError::decode(&url, format!("{} response has no Data", action)))
    }
}
