//! Local directory listing

use crate::error::{MigrateError, Result};
use crate::inventory::SourceEntry;
use crate::source::ListingAdapter;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Sentinel file written by local Maven caches
const REMOTE_REPOSITORIES: &str = "_remote.repositories";

static VALID_DIR_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.-]+$").expect("directory name regex must compile"));

/// Walks a directory tree
#[derive(Debug, Clone)]
pub struct LocalListing {
    root: PathBuf,
}

impl LocalListing {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk the tree synchronously
    pub fn scan(&self) -> Result<Vec<SourceEntry>> {
        let root = self.root.as_path();
        if !root.exists() {
            tracing::warn!("Source directory {} does not exist, nothing to migrate", root.display());
            return Ok(Vec::new());
        }
        if !root.is_dir() {
            return Err(MigrateError::config(format!(
                "Source '{}' is not a directory",
                root.display()
            )));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || keep(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                MigrateError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata().map_err(|e| MigrateError::io(entry.path(), e.into()))?.len();
            entries.push(SourceEntry::local(root, entry.path(), size));
        }

        tracing::debug!("Found {} files below {}", entries.len(), root.display());
        Ok(entries)
    }
}

fn keep(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return false;
    }
    if entry.file_type().is_dir() {
        return VALID_DIR_NAME.is_match(&name);
    }
    name != REMOTE_REPOSITORIES && !name.starts_with('_')
}

#[async_trait]
impl ListingAdapter for LocalListing {
    fn describe(&self) -> String {
        format!("local directory {}", self.root.display())
    }

    async fn list(&self) -> Result<Vec<SourceEntry>> {
        let listing = self.clone();
        tokio::task::spawn_blocking(move || listing.scan())
            .await
            .map_err(|e| MigrateError::config(format!("Directory walk failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_walk_skips_hidden_and_sentinels() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "org/acme/lib/1.0/lib-1.0.jar", b"jar");
        touch(root, "org/acme/lib/1.0/_remote.repositories", b"x");
        touch(root, "org/acme/lib/1.0/_marker", b"x");
        touch(root, "org/acme/lib/1.0/.hidden", b"x");
        touch(root, ".cache/org/x.jar", b"x");
        touch(root, "bad dir/x/1/x-1.jar", b"x");

        let entries = LocalListing::new(root).list().await.unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["org/acme/lib/1.0/lib-1.0.jar"]);
        assert_eq!(entries[0].size, 3);
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let entries = LocalListing::new(dir.path().join("absent")).list().await.unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_file_root_is_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "file.bin", b"x");
        assert!(LocalListing::new(dir.path().join("file.bin")).scan().is_err());
    }

    #[test]
    fn test_root_name_is_not_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("my repo");
        touch(&root, "a.bin", b"x");
        let entries = tokio_test::block_on(LocalListing::new(&root).list()).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
