//! Nexus assets listing
//!
//! Pages through `GET /service/rest/v1/assets?repository={name}` following
//! the continuation token. Older Nexus 3 installs serve the API below a
//! `/nexus` prefix; a 404 on the plain path switches to it for the rest of
//! the listing.

use crate::config::Credentials;
use crate::error::{MigrateError, Result};
use crate::http::{authorize, ensure_success};
use crate::inventory::{EntryHint, SourceEntry};
use crate::source::{repository_name, ListingAdapter};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

const ASSETS_PATH: &str = "service/rest/v1/assets";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetPage {
    #[serde(default)]
    items: Vec<Asset>,
    #[serde(default)]
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Asset {
    download_url: String,
    path: String,
    #[serde(default)]
    checksum: Option<Checksum>,
    #[serde(default)]
    maven2: Option<Maven2>,
    #[serde(default)]
    pypi: Option<Pypi>,
    #[serde(default)]
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Checksum {
    #[serde(default)]
    sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Maven2 {
    #[serde(default)]
    group_id: String,
    #[serde(default)]
    artifact_id: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct Pypi {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

impl Asset {
    fn into_entry(self) -> SourceEntry {
        let mut entry = SourceEntry::remote(self.path, self.download_url, self.file_size.unwrap_or(0));

        if let Some(m) = self.maven2.filter(|m| !m.group_id.is_empty() && !m.artifact_id.is_empty() && !m.version.is_empty()) {
            entry = entry.with_hint(EntryHint::Maven {
                group: m.group_id,
                artifact: m.artifact_id,
                version: m.version,
            });
        } else if let Some(p) = self.pypi.filter(|p| !p.name.is_empty() && !p.version.is_empty()) {
            entry = entry.with_hint(EntryHint::Pypi {
                name: p.name,
                version: p.version,
            });
        }

        if let Some(sha256) = self.checksum.and_then(|c| c.sha256) {
            entry = entry.with_sha256(sha256);
        }
        entry
    }
}

/// Lists a Nexus repository
#[derive(Debug)]
pub struct NexusListing {
    client: reqwest::Client,
    /// `{scheme}://{host}`
    origin: String,
    repository: String,
    credentials: Option<Credentials>,
    legacy_prefix: AtomicBool,
}

impl NexusListing {
    pub fn new(client: reqwest::Client, source: &str, credentials: Option<Credentials>) -> Result<Self> {
        let url = Url::parse(source.trim())
            .map_err(|e| MigrateError::config(format!("Invalid source URL '{}': {}", source, e)))?;
        let origin = url.origin().ascii_serialization();
        Ok(Self {
            client,
            origin,
            repository: repository_name(source)?,
            credentials,
            legacy_prefix: AtomicBool::new(false),
        })
    }

    fn assets_url(&self, legacy: bool) -> String {
        if legacy {
            format!("{}/nexus/{}", self.origin, ASSETS_PATH)
        } else {
            format!("{}/{}", self.origin, ASSETS_PATH)
        }
    }

    async fn get_page(&self, url: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(url).query(&[("repository", self.repository.as_str())]);
        if let Some(token) = token {
            request = request.query(&[("continuationToken", token)]);
        }
        authorize(request, self.credentials.as_ref())
            .send()
            .await
            .map_err(|e| MigrateError::transport(url, e))
    }

    async fn fetch_page(&self, token: Option<&str>) -> Result<AssetPage> {
        let legacy = self.legacy_prefix.load(Ordering::Relaxed);
        let mut url = self.assets_url(legacy);
        let mut response = self.get_page(&url, token).await?;

        if !legacy && response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("{} returned 404, trying the /nexus prefix", url);
            url = self.assets_url(true);
            response = self.get_page(&url, token).await?;
            if response.status().is_success() {
                self.legacy_prefix.store(true, Ordering::Relaxed);
            }
        }

        let body = ensure_success(&url, response)
            .await?
            .text()
            .await
            .map_err(|e| MigrateError::transport(&url, e))?;
        serde_json::from_str(&body).map_err(|e| MigrateError::decode(&url, e))
    }
}

#[async_trait]
impl ListingAdapter for NexusListing {
    fn describe(&self) -> String {
        format!("nexus repository {} on {}", self.repository, self.origin)
    }

    async fn list(&self) -> Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .fetch_page(token.as_deref())
                .await
                .map_err(|e| e.with_context(format!("Failed to list nexus repository {}", self.repository)))?;
            pages += 1;
            tracing::debug!("Nexus page {}: {} assets", pages, page.items.len());
            entries.extend(page.items.into_iter().map(Asset::into_entry));

            match page.continuation_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::info!("Listed {} assets from {}", entries.len(), self.describe());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing(server: &MockServer) -> NexusListing {
        NexusListing::new(
            reqwest::Client::new(),
            &format!("{}/repository/releases", server.uri()),
            Some(Credentials::new("admin", "admin123")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_follows_continuation_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/assets"))
            .and(query_param("continuationToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "downloadUrl": "http://nexus/repository/releases/g/a/1/a-1.pom",
                    "path": "g/a/1/a-1.pom",
                    "maven2": {"groupId": "g", "artifactId": "a", "version": "1"}
                }],
                "continuationToken": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/assets"))
            .and(query_param("repository", "releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "downloadUrl": "http://nexus/repository/releases/g/a/1/a-1.jar",
                    "path": "/g/a/1/a-1.jar",
                    "fileSize": 42,
                    "checksum": {"sha1": "x", "sha256": "abc"}
                }],
                "continuationToken": "next"
            })))
            .mount(&server)
            .await;

        let entries = listing(&server).list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].relative_path, "g/a/1/a-1.jar");
        assert_eq!(entries[0].size, 42);
        assert_eq!(entries[0].sha256.as_deref(), Some("abc"));
        assert_eq!(
            entries[1].hint,
            Some(EntryHint::Maven {
                group: "g".into(),
                artifact: "a".into(),
                version: "1".into()
            })
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_nexus_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/assets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/nexus/service/rest/v1/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "downloadUrl": "http://nexus/repository/py/requests-2.31.0.tar.gz",
                    "path": "packages/requests/2.31.0/requests-2.31.0.tar.gz",
                    "pypi": {"name": "requests", "version": "2.31.0"}
                }]
            })))
            .mount(&server)
            .await;

        let nexus = listing(&server);
        let entries = nexus.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].hint, Some(EntryHint::Pypi { .. })));
        assert!(nexus.legacy_prefix.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_failed_page_aborts_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/assets"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = listing(&server).list().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
