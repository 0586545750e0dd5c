//! Python distributions
//!
//! Only entries whose listing carries the package name and version are
//! migrated. Each file is uploaded as a multipart form with its metadata.

use crate::config::ArtifactType;
use crate::error::{MigrateError, Result};
use crate::inventory::{Coordinate, EntryHint, Payload, SourceEntry};
use crate::kind::{ArtifactKind, Layout};

/// Distribution type for a file name, from its extension
pub fn distribution_type(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    const TYPES: &[(&str, &str)] = &[
        (".whl", "bdist_wheel"),
        (".exe", "bdist_wininst"),
        (".egg", "bdist_egg"),
        (".tar.bz2", "sdist"),
        (".tar.gz", "sdist"),
        (".zip", "sdist"),
    ];
    TYPES
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, filetype)| *filetype)
}

/// PyPI strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct PypiKind;

impl ArtifactKind for PypiKind {
    fn artifact_type(&self) -> ArtifactType {
        ArtifactType::Pypi
    }

    fn layout(&self) -> Layout {
        Layout::Flat
    }

    fn classify(&self, entry: &SourceEntry) -> Result<Coordinate> {
        let (name, version) = match &entry.hint {
            Some(EntryHint::Pypi { name, version }) if !name.is_empty() && !version.is_empty() => {
                (name, version)
            }
            _ => {
                return Err(MigrateError::classification(
                    &entry.relative_path,
                    "no package name and version in listing",
                ))
            }
        };

        if distribution_type(&entry.name).is_none() {
            return Err(MigrateError::classification(
                &entry.relative_path,
                "unsupported distribution extension",
            ));
        }

        Ok(Coordinate::Flat {
            package: name.clone(),
            version: version.clone(),
            filename: entry.name.clone(),
        })
    }

    fn identity_key(&self, coordinate: &Coordinate) -> Option<String> {
        match coordinate {
            Coordinate::Flat { package, version, .. } => Some(format!("{}:{}", package, version)),
            _ => None,
        }
    }

    fn destination_path(&self, entry: &SourceEntry, _coordinate: &Coordinate) -> String {
        entry.name.clone()
    }

    fn payload(&self, entry: &SourceEntry, coordinate: &Coordinate) -> Result<Payload> {
        let Coordinate::Flat {
            package,
            version,
            filename,
        } = coordinate
        else {
            return Err(MigrateError::classification(&entry.relative_path, "not a package coordinate"));
        };
        let filetype = distribution_type(filename)
            .ok_or_else(|| MigrateError::classification(&entry.relative_path, "unsupported distribution extension"))?;

        Ok(Payload::PypiDistribution {
            name: package.clone(),
            version: version.clone(),
            sha256_digest: entry.sha256.clone().unwrap_or_default(),
            filetype: filetype.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> SourceEntry {
        SourceEntry::remote(path, format!("http://nexus/repository/py/{}", path), 100)
            .with_hint(EntryHint::Pypi {
                name: "requests".into(),
                version: "2.31.0".into(),
            })
            .with_sha256("abc123")
    }

    #[test]
    fn test_distribution_types() {
        assert_eq!(distribution_type("pkg-1.0-py3-none-any.whl"), Some("bdist_wheel"));
        assert_eq!(distribution_type("pkg-1.0.tar.gz"), Some("sdist"));
        assert_eq!(distribution_type("pkg-1.0.TAR.BZ2"), Some("sdist"));
        assert_eq!(distribution_type("pkg-1.0.zip"), Some("sdist"));
        assert_eq!(distribution_type("pkg-1.0.egg"), Some("bdist_egg"));
        assert_eq!(distribution_type("pkg-1.0.win32.exe"), Some("bdist_wininst"));
        assert_eq!(distribution_type("pkg-1.0.tar.xz"), None);
    }

    #[test]
    fn test_unit_payload() {
        let unit = PypiKind.unit(&entry("packages/requests/2.31.0/requests-2.31.0.tar.gz")).unwrap();
        assert_eq!(unit.display_name(), "requests=2.31.0");
        assert_eq!(unit.destination_path, "requests-2.31.0.tar.gz");
        assert_eq!(
            unit.payload,
            Payload::PypiDistribution {
                name: "requests".into(),
                version: "2.31.0".into(),
                sha256_digest: "abc123".into(),
                filetype: "sdist".into(),
            }
        );
    }

    #[test]
    fn test_missing_hint_fails() {
        let plain = SourceEntry::remote("simple/requests/", "http://nexus/x", 0);
        assert!(PypiKind.classify(&plain).is_err());
    }
}
