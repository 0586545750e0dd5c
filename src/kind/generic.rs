//! Generic files keyed by path

use crate::config::ArtifactType;
use crate::error::{MigrateError, Result};
use crate::inventory::{Coordinate, SourceEntry};
use crate::kind::{ArtifactKind, Layout};

/// Version the destination reports for every generic file
pub const GENERIC_VERSION: &str = "latest";

/// Generic strategy with an optional path prefix filter
#[derive(Debug, Clone, Default)]
pub struct GenericKind {
    prefix: Option<String>,
}

impl GenericKind {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.map(|p| p.trim_start_matches('/').to_string()),
        }
    }
}

impl ArtifactKind for GenericKind {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::Generic
    }

    fn layout(&self) -> Layout {
        Layout::Flat
    }

    fn accepts(&self, entry: &SourceEntry) -> bool {
        match &self.prefix {
            Some(prefix) => entry.relative_path.trim_start_matches('/').starts_with(prefix.as_str()),
            None => true,
        }
    }

    fn classify(&self, entry: &SourceEntry) -> Result<Coordinate> {
        let path = entry.relative_path.trim_matches('/');
        if path.is_empty() {
            return Err(MigrateError::classification(&entry.relative_path, "empty path"));
        }
        Ok(Coordinate::Path {
            path: path.to_string(),
        })
    }

    fn identity_key(&self, coordinate: &Coordinate) -> Option<String> {
        match coordinate {
            Coordinate::Path { path } => Some(format!("{}:{}", path, GENERIC_VERSION)),
            _ => None,
        }
    }

    fn largest_first(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key() {
        let kind = GenericKind::default();
        let entry = SourceEntry::remote("tools/bin/app.tar.gz", "http://src/tools/bin/app.tar.gz", 1);
        let unit = kind.unit(&entry).unwrap();
        assert_eq!(kind.identity_key(&unit.coordinate).as_deref(), Some("tools/bin/app.tar.gz:latest"));
        assert_eq!(kind.file_key(&unit), None);
    }

    #[test]
    fn test_prefix_filter() {
        let kind = GenericKind::new(Some("/tools/".into()));
        assert!(kind.accepts(&SourceEntry::remote("tools/a.bin", "http://src/a", 1)));
        assert!(!kind.accepts(&SourceEntry::remote("docs/a.txt", "http://src/b", 1)));
    }

    #[test]
    fn test_empty_path_fails() {
        let entry = SourceEntry::remote("/", "http://src/", 0);
        assert!(GenericKind::default().classify(&entry).is_err());
    }
}
