//! Source entries, coordinates and transfer units

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Version used for artifact-level metadata files that belong to no version
pub const METADATA_VERSION: &str = "Metadata";

/// Where a unit's bytes are read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLocation {
    /// File on the local filesystem
    Local(PathBuf),
    /// Download URL on a remote repository
    Remote(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Coordinates a listing already knows, so the path need not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryHint {
    Maven {
        group: String,
        artifact: String,
        version: String,
    },
    Pypi {
        name: String,
        version: String,
    },
    Composer {
        name: String,
        version: String,
    },
}

/// One file reported by a listing adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// File name (last path segment)
    pub name: String,
    /// Path relative to the repository root, `/`-separated
    pub relative_path: String,
    /// Size in bytes (0 when the listing does not report it)
    pub size: u64,
    /// Where to read the file from
    pub location: SourceLocation,
    /// Pre-parsed coordinates
    pub hint: Option<EntryHint>,
    /// SHA-256 digest reported by the listing
    pub sha256: Option<String>,
}

impl SourceEntry {
    /// Entry for a local file below `root`
    pub fn local(root: &Path, path: &Path, size: u64) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Self {
            name: file_name(&relative_path).to_string(),
            relative_path,
            size,
            location: SourceLocation::Local(path.to_path_buf()),
            hint: None,
            sha256: None,
        }
    }

    /// Entry for a remote file
    pub fn remote(relative_path: impl Into<String>, download_url: impl Into<String>, size: u64) -> Self {
        let relative_path = relative_path.into().trim_matches('/').to_string();
        Self {
            name: file_name(&relative_path).to_string(),
            relative_path,
            size,
            location: SourceLocation::Remote(download_url.into()),
            hint: None,
            sha256: None,
        }
    }

    pub fn with_hint(mut self, hint: EntryHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        let digest = digest.into();
        if !digest.is_empty() {
            self.sha256 = Some(digest);
        }
        self
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Artifact identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Coordinate {
    /// group / artifact / version / file
    Hierarchical {
        group: String,
        artifact: String,
        version: String,
        filename: String,
    },
    /// package / version / file
    Flat {
        package: String,
        version: String,
        filename: String,
    },
    /// A file keyed only by its path
    Path { path: String },
}

impl Coordinate {
    pub fn hierarchical(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self::Hierarchical {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            filename: filename.into(),
        }
    }

    /// Name used in reports
    pub fn display_name(&self) -> String {
        match self {
            Self::Hierarchical {
                group,
                artifact,
                version,
                ..
            } => format!("{}:{}:{}", group, artifact, version),
            Self::Flat { package, version, .. } => format!("{}={}", package, version),
            Self::Path { path } => file_name(path).to_string(),
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Hierarchical { filename, .. } | Self::Flat { filename, .. } => filename,
            Self::Path { path } => file_name(path),
        }
    }

    /// True for artifact-level metadata files
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::Hierarchical { version, .. } if version == METADATA_VERSION)
    }
}

/// How a unit is uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Body is the file as-is
    Raw,
    /// Multipart form carrying the distribution's metadata
    PypiDistribution {
        name: String,
        version: String,
        sha256_digest: String,
        filetype: String,
    },
    /// Archive PUT to the repository URL with the version as a query parameter
    ComposerPackage { version: String },
}

/// The atomic work item of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferUnit {
    pub coordinate: Coordinate,
    pub source: SourceLocation,
    /// Path below the destination repository URL
    pub destination_path: String,
    pub size: u64,
    pub payload: Payload,
}

impl TransferUnit {
    pub fn display_name(&self) -> String {
        self.coordinate.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_entry_relative_path() {
        let root = Path::new("/repo");
        let entry = SourceEntry::local(root, Path::new("/repo/org/acme/lib/1.0/lib-1.0.jar"), 10);
        assert_eq!(entry.relative_path, "org/acme/lib/1.0/lib-1.0.jar");
        assert_eq!(entry.name, "lib-1.0.jar");
        assert_eq!(entry.location, SourceLocation::Local(PathBuf::from("/repo/org/acme/lib/1.0/lib-1.0.jar")));
    }

    #[test]
    fn test_remote_entry_trims_slashes() {
        let entry = SourceEntry::remote("/dir/file.bin/", "http://src/dir/file.bin", 3);
        assert_eq!(entry.relative_path, "dir/file.bin");
        assert_eq!(entry.name, "file.bin");
    }

    #[test]
    fn test_display_names() {
        let maven = Coordinate::hierarchical("org.acme", "lib", "1.0", "lib-1.0.jar");
        assert_eq!(maven.display_name(), "org.acme:lib:1.0");

        let pypi = Coordinate::Flat {
            package: "requests".into(),
            version: "2.31.0".into(),
            filename: "requests-2.31.0.tar.gz".into(),
        };
        assert_eq!(pypi.display_name(), "requests=2.31.0");

        let generic = Coordinate::Path { path: "a/b/c.bin".into() };
        assert_eq!(generic.display_name(), "c.bin");
    }

    #[test]
    fn test_metadata_detection() {
        assert!(Coordinate::hierarchical("g", "a", METADATA_VERSION, "maven-metadata.xml").is_metadata());
        assert!(!Coordinate::hierarchical("g", "a", "1.0", "a-1.0.pom").is_metadata());
    }
}
