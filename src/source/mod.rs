//! Source listing adapters
//!
//! An adapter turns a source repository into a flat list of `SourceEntry`
//! values. Local directories are walked; Nexus and Artifactory repositories
//! are paged through their search APIs. Composer runs expand the package
//! indexes found by any of them.

mod composer;
mod jfrog;
mod local;
mod nexus;

pub use composer::ComposerIndexListing;
pub use jfrog::JfrogListing;
pub use local::LocalListing;
pub use nexus::NexusListing;

use crate::config::{ArtifactType, MigrateConfig, SourceType};
use crate::error::{MigrateError, Result};
use crate::inventory::SourceEntry;
use async_trait::async_trait;
use url::Url;

/// Produces the entries of a source repository
#[async_trait]
pub trait ListingAdapter: Send + Sync {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// List every file of the repository
    async fn list(&self) -> Result<Vec<SourceEntry>>;
}

/// Adapter for the configured source
pub fn adapter_for(config: &MigrateConfig, client: reqwest::Client) -> Result<Box<dyn ListingAdapter>> {
    let adapter: Box<dyn ListingAdapter> = match config.source_type {
        SourceType::Local => Box::new(LocalListing::new(&config.source)),
        SourceType::Nexus => Box::new(NexusListing::new(
            client.clone(),
            &config.source,
            config.source_credentials.clone(),
        )?),
        SourceType::Jfrog => Box::new(JfrogListing::new(
            client.clone(),
            &config.source,
            config.source_credentials.clone(),
        )?),
    };
    if config.kind == ArtifactType::Composer {
        return Ok(Box::new(ComposerIndexListing::new(
            adapter,
            client,
            config.source_credentials.clone(),
        )));
    }
    Ok(adapter)
}

/// Repository name of a `{base}/repository/{name}` style URL
pub fn repository_name(source: &str) -> Result<String> {
    let url = Url::parse(source.trim()).map_err(|e| MigrateError::config(format!("Invalid source URL '{}': {}", source, e)))?;
    url.path_segments()
        .and_then(|mut segments| segments.nth(1))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MigrateError::config(format!("Cannot find repository name in '{}'", source)))
}
