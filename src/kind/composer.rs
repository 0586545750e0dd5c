//! Composer packages
//!
//! Units come from the package indexes a Composer repository serves, one per
//! package version. The archive is PUT to the repository URL with the version
//! in the query string.

use crate::config::ArtifactType;
use crate::error::{MigrateError, Result};
use crate::inventory::{Coordinate, EntryHint, Payload, SourceEntry};
use crate::kind::{ArtifactKind, Layout};

/// Composer strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposerKind;

impl ArtifactKind for ComposerKind {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::Composer
    }

    fn layout(&self) -> Layout {
        Layout::Flat
    }

    fn classify(&self, entry: &SourceEntry) -> Result<Coordinate> {
        match &entry.hint {
            Some(EntryHint::Composer { name, version }) if !name.is_empty() && !version.is_empty() => {
                Ok(Coordinate::Flat {
                    package: name.clone(),
                    version: version.clone(),
                    filename: entry.name.clone(),
                })
            }
            _ => Err(MigrateError::classification(
                &entry.relative_path,
                "not listed in a package index",
            )),
        }
    }

    fn identity_key(&self, coordinate: &Coordinate) -> Option<String> {
        match coordinate {
            Coordinate::Flat { package, version, .. } => Some(format!("{}:{}", package, version)),
            _ => None,
        }
    }

    fn payload(&self, entry: &SourceEntry, coordinate: &Coordinate) -> Result<Payload> {
        match coordinate {
            Coordinate::Flat { version, .. } => Ok(Payload::ComposerPackage {
                version: version.clone(),
            }),
            _ => Err(MigrateError::classification(&entry.relative_path, "not a package coordinate")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SourceEntry {
        SourceEntry::remote(
            "acme/log/1.2.0/acme-log-1.2.0.zip",
            "http://nexus/repository/php/acme/log/1.2.0/acme-log-1.2.0.zip",
            0,
        )
        .with_hint(EntryHint::Composer {
            name: "acme/log".into(),
            version: "1.2.0".into(),
        })
    }

    #[test]
    fn test_unit() {
        let unit = ComposerKind.unit(&entry()).unwrap();
        assert_eq!(unit.display_name(), "acme/log=1.2.0");
        assert_eq!(unit.destination_path, "acme/log/1.2.0/acme-log-1.2.0.zip");
        assert_eq!(
            unit.payload,
            Payload::ComposerPackage {
                version: "1.2.0".into()
            }
        );
        assert_eq!(ComposerKind.identity_key(&unit.coordinate).as_deref(), Some("acme/log:1.2.0"));
    }

    #[test]
    fn test_unindexed_entry_fails() {
        let plain = SourceEntry::remote("p/acme/log.json", "http://nexus/p/acme/log.json", 10);
        assert!(ComposerKind.classify(&plain).is_err());
    }
}
