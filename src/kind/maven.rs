//! Maven repositories
//!
//! `org/acme/lib/1.0/lib-1.0.jar` is group `org.acme`, artifact `lib`,
//! version `1.0`. A `maven-metadata.xml` directly below the artifact
//! directory belongs to no version and gets the metadata sentinel. A path
//! with no group directory (`lib/1.0/lib-1.0.jar`) has an empty group.

use crate::config::ArtifactType;
use crate::error::{MigrateError, Result};
use crate::inventory::{Coordinate, EntryHint, SourceEntry, TransferUnit, METADATA_VERSION};
use crate::kind::{ArtifactKind, Layout, PathLayout};

const METADATA_FILE: &str = "maven-metadata.xml";
const SNAPSHOT: &str = "SNAPSHOT";

/// Maven strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct MavenKind;

impl MavenKind {
    /// Split a repository-relative path into group/artifact/version/file
    pub fn parse_path(path: &str) -> Result<Coordinate> {
        let path = path.trim_matches('/');
        let chunks: Vec<&str> = path.split('/').collect();
        let size = chunks.len();
        if size < 3 || chunks.iter().any(|c| c.is_empty()) {
            return Err(MigrateError::classification(path, "expected artifact/version/file"));
        }

        let filename = chunks[size - 1];
        let parent = chunks[size - 2];

        if filename.contains(METADATA_FILE) && !parent.contains(SNAPSHOT) {
            return Ok(Coordinate::hierarchical(
                chunks[..size - 2].join("."),
                parent,
                METADATA_VERSION,
                filename,
            ));
        }

        Ok(Coordinate::hierarchical(
            chunks[..size - 3].join("."),
            chunks[size - 3],
            parent,
            filename,
        ))
    }
}

impl ArtifactKind for MavenKind {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::Maven
    }

    fn layout(&self) -> Layout {
        Layout::Hierarchical
    }

    fn path_layout(&self) -> PathLayout {
        PathLayout::Nested
    }

    fn classify(&self, entry: &SourceEntry) -> Result<Coordinate> {
        match &entry.hint {
            Some(EntryHint::Maven {
                group,
                artifact,
                version,
            }) if !group.is_empty() && !artifact.is_empty() && !version.is_empty() => Ok(
                Coordinate::hierarchical(group, artifact, version, entry.name.clone()),
            ),
            _ => Self::parse_path(&entry.relative_path),
        }
    }

    fn identity_key(&self, coordinate: &Coordinate) -> Option<String> {
        match coordinate {
            Coordinate::Hierarchical {
                group,
                artifact,
                version,
                ..
            } if version != METADATA_VERSION => Some(format!("{}:{}:{}", group, artifact, version)),
            _ => None,
        }
    }

    /// The repository path itself, so group directories containing dots
    /// still match the destination's file listing
    fn file_key(&self, unit: &TransferUnit) -> Option<String> {
        Some(unit.destination_path.clone())
    }

    fn uses_file_existence(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versioned_file() {
        let c = MavenKind::parse_path("org/kohsuke/stapler/json-lib/2.4-jenkins-2/json-lib-2.4-jenkins-2-sources.jar").unwrap();
        assert_eq!(
            c,
            Coordinate::hierarchical("org.kohsuke.stapler", "json-lib", "2.4-jenkins-2", "json-lib-2.4-jenkins-2-sources.jar")
        );
    }

    #[test]
    fn test_parse_artifact_metadata() {
        let c = MavenKind::parse_path("org/kohsuke/stapler/json-lib/maven-metadata.xml").unwrap();
        assert_eq!(
            c,
            Coordinate::hierarchical("org.kohsuke.stapler", "json-lib", METADATA_VERSION, "maven-metadata.xml")
        );
        assert!(c.is_metadata());
    }

    #[test]
    fn test_snapshot_metadata_stays_versioned() {
        let c = MavenKind::parse_path("org/acme/lib/1.0-SNAPSHOT/maven-metadata.xml").unwrap();
        assert_eq!(c, Coordinate::hierarchical("org.acme", "lib", "1.0-SNAPSHOT", "maven-metadata.xml"));
    }

    #[test]
    fn test_short_paths_fail() {
        assert!(MavenKind::parse_path("lib/1.0").is_err());
        assert!(MavenKind::parse_path("lib//lib.jar").is_err());
        assert!(MavenKind::parse_path("").is_err());
    }

    #[test]
    fn test_path_without_group() {
        let c = MavenKind::parse_path("a/1/a-1.jar").unwrap();
        assert_eq!(c, Coordinate::hierarchical("", "a", "1", "a-1.jar"));
        assert_eq!(MavenKind.identity_key(&c).as_deref(), Some(":a:1"));
    }

    #[test]
    fn test_keys() {
        let kind = MavenKind;
        let unit = kind.unit(&SourceEntry::remote("org/acme/lib/1.0/lib-1.0.jar", "http://src/x", 1)).unwrap();
        assert_eq!(kind.identity_key(&unit.coordinate).as_deref(), Some("org.acme:lib:1.0"));
        assert_eq!(kind.file_key(&unit).as_deref(), Some("org/acme/lib/1.0/lib-1.0.jar"));

        let meta = kind.unit(&SourceEntry::remote("org/acme/lib/maven-metadata.xml", "http://src/m", 1)).unwrap();
        assert_eq!(kind.identity_key(&meta.coordinate), None);
        assert_eq!(kind.file_key(&meta).as_deref(), Some("org/acme/lib/maven-metadata.xml"));
    }

    #[test]
    fn test_file_key_keeps_dotted_directories() {
        let unit = MavenKind
            .unit(&SourceEntry::remote("com/foo.bar/lib/1.0/lib-1.0.jar", "http://src/x", 1))
            .unwrap();
        assert_eq!(unit.coordinate, Coordinate::hierarchical("com.foo.bar", "lib", "1.0", "lib-1.0.jar"));
        assert_eq!(MavenKind.file_key(&unit).as_deref(), Some("com/foo.bar/lib/1.0/lib-1.0.jar"));
    }

    #[test]
    fn test_hint_wins_over_path() {
        let entry = SourceEntry::remote("org/acme/lib/1.0-SNAPSHOT/lib-1.0-20240101.jar", "http://src/x", 1)
            .with_hint(EntryHint::Maven {
                group: "org.acme".into(),
                artifact: "lib".into(),
                version: "1.0-20240101".into(),
            });
        let c = MavenKind.classify(&entry).unwrap();
        assert_eq!(c, Coordinate::hierarchical("org.acme", "lib", "1.0-20240101", "lib-1.0-20240101.jar"));
    }
}
