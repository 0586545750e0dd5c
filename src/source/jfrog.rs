//! Artifactory listing through one AQL query

use crate::config::Credentials;
use crate::error::{MigrateError, Result};
use crate::http::{authorize, ensure_success};
use crate::inventory::SourceEntry;
use crate::source::{repository_name, ListingAdapter};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct AqlResult {
    #[serde(default)]
    results: Vec<AqlItem>,
    #[serde(default)]
    range: Option<AqlRange>,
}

#[derive(Debug, Deserialize)]
struct AqlItem {
    #[serde(default)]
    path: String,
    name: String,
    #[serde(default, rename = "type")]
    item_type: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct AqlRange {
    #[serde(default)]
    total: u64,
}

impl AqlItem {
    /// `path/name`, or `name` for items at the repository root
    fn file_path(&self) -> String {
        match self.path.as_str() {
            "" | "." => self.name.clone(),
            path => format!("{}/{}", path.trim_matches('/'), self.name),
        }
    }
}

/// Lists an Artifactory repository
#[derive(Debug)]
pub struct JfrogListing {
    client: reqwest::Client,
    /// Source URL without trailing slash; download URLs hang off it
    source: String,
    search_url: String,
    repository: String,
    credentials: Option<Credentials>,
}

impl JfrogListing {
    pub fn new(client: reqwest::Client, source: &str, credentials: Option<Credentials>) -> Result<Self> {
        let url = Url::parse(source.trim())
            .map_err(|e| MigrateError::config(format!("Invalid source URL '{}': {}", source, e)))?;
        Ok(Self {
            client,
            source: source.trim().trim_end_matches('/').to_string(),
            search_url: format!("{}/artifactory/api/search/aql", url.origin().ascii_serialization()),
            repository: repository_name(source)?,
            credentials,
        })
    }

    fn query(&self) -> String {
        format!("items.find({{\"repo\": \"{}\"}})", self.repository)
    }
}

#[async_trait]
impl ListingAdapter for JfrogListing {
    fn describe(&self) -> String {
        format!("artifactory repository {}", self.repository)
    }

    async fn list(&self) -> Result<Vec<SourceEntry>> {
        let url = &self.search_url;
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(self.query());
        let response = authorize(request, self.credentials.as_ref())
            .send()
            .await
            .map_err(|e| MigrateError::transport(url, e))?;
        let body = ensure_success(url, response)
            .await
            .map_err(|e| e.with_context("AQL query failed"))?
            .text()
            .await
            .map_err(|e| MigrateError::transport(url, e))?;
        let result: AqlResult = serde_json::from_str(&body).map_err(|e| MigrateError::decode(url, e))?;

        if let Some(range) = &result.range {
            tracing::debug!("AQL reported {} items", range.total);
        }

        let entries: Vec<SourceEntry> = result
            .results
            .into_iter()
            .filter(|item| item.item_type != "folder")
            .map(|item| {
                let path = item.file_path();
                let download_url = format!("{}/{}", self.source, path);
                SourceEntry::remote(path, download_url, item.size)
            })
            .collect();

        tracing::info!("Listed {} files from {}", entries.len(), self.describe());
        Ok(entries)
    }
}
