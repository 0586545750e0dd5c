//! Composer package index expansion
//!
//! A Composer repository lists its archives through JSON package indexes
//! (`packages.json`, `p/{vendor}/{name}.json`, `p2/...`). This adapter lists
//! the repository with an inner adapter, fetches every index it finds and
//! yields one entry per package version pointing at the version's dist URL.
//! Any index that cannot be fetched or decoded fails the whole listing.

use crate::config::Credentials;
use crate::error::{IoResultExt, MigrateError, Result};
use crate::http::{authorize, ensure_success};
use crate::inventory::{EntryHint, SourceEntry, SourceLocation};
use crate::source::ListingAdapter;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

const INDEX_SUFFIX: &str = ".json";

#[derive(Debug, Deserialize)]
struct PackageIndex {
    #[serde(default)]
    packages: Packages,
}

/// PHP encodes an empty map as `[]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Packages {
    Map(BTreeMap<String, Versions>),
    Empty(Vec<serde_json::Value>),
}

impl Default for Packages {
    fn default() -> Self {
        Self::Empty(Vec::new())
    }
}

/// Composer 1 keys versions by name, Composer 2 (`p2/`) lists them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Versions {
    ByVersion(BTreeMap<String, PackageVersion>),
    List(Vec<PackageVersion>),
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    dist: Option<Dist>,
}

#[derive(Debug, Deserialize)]
struct Dist {
    #[serde(default)]
    url: String,
}

impl PackageIndex {
    /// Entries for every version that has a dist URL
    fn into_entries(self) -> Vec<SourceEntry> {
        let Packages::Map(packages) = self.packages else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        for (package, versions) in packages {
            let versions: Vec<(String, PackageVersion)> = match versions {
                Versions::ByVersion(map) => map.into_iter().collect(),
                Versions::List(list) => list.into_iter().map(|v| (String::new(), v)).collect(),
            };
            for (key, info) in versions {
                let name = if info.name.is_empty() { package.clone() } else { info.name };
                let version = if info.version.is_empty() { key } else { info.version };
                let Some(url) = info.dist.map(|d| d.url).filter(|u| !u.is_empty()) else {
                    tracing::warn!("{} {} has no dist URL", name, version);
                    continue;
                };
                let path = format!("{}/{}/{}", name, version, archive_name(&url));
                entries.push(SourceEntry::remote(path, url, 0).with_hint(EntryHint::Composer { name, version }));
            }
        }
        entries
    }
}

/// Last path segment of a dist URL, without query or fragment
fn archive_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Expands the package indexes of a Composer repository
pub struct ComposerIndexListing {
    inner: Box<dyn ListingAdapter>,
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl ComposerIndexListing {
    pub fn new(inner: Box<dyn ListingAdapter>, client: reqwest::Client, credentials: Option<Credentials>) -> Self {
        Self {
            inner,
            client,
            credentials,
        }
    }

    async fn read_index(&self, location: &SourceLocation) -> Result<PackageIndex> {
        let (origin, body) = match location {
            SourceLocation::Local(path) => {
                let body = tokio::fs::read_to_string(path).await.with_path(path)?;
                (path.display().to_string(), body)
            }
            SourceLocation::Remote(url) => {
                let request = authorize(self.client.get(url), self.credentials.as_ref());
                let response = request.send().await.map_err(|e| MigrateError::transport(url, e))?;
                let body = ensure_success(url, response)
                    .await?
                    .text()
                    .await
                    .map_err(|e| MigrateError::transport(url, e))?;
                (url.clone(), body)
            }
        };
        serde_json::from_str(&body).map_err(|e| MigrateError::decode(origin, e))
    }
}

#[async_trait]
impl ListingAdapter for ComposerIndexListing {
    fn describe(&self) -> String {
        format!("composer indexes of {}", self.inner.describe())
    }

    async fn list(&self) -> Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        let mut indexes = 0usize;

        for index in self.inner.list().await? {
            if !index.relative_path.ends_with(INDEX_SUFFIX) {
                continue;
            }
            indexes += 1;
            let parsed = self
                .read_index(&index.location)
                .await
                .map_err(|e| e.with_context(format!("Failed to read package index {}", index.relative_path)))?;
            entries.extend(parsed.into_entries());
        }

        tracing::info!("Found {} package versions in {} indexes", entries.len(), indexes);
        Ok(entries)
    }
}
