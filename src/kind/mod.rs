//! Per-format strategies
//!
//! The pipeline is the same for every artifact format. What differs is how a
//! path becomes a coordinate, which keys the destination reports for it, and
//! how the unit is uploaded. Each format supplies those as an `ArtifactKind`.

mod composer;
mod generic;
mod maven;
mod pypi;

pub use composer::ComposerKind;
pub use generic::GenericKind;
pub use maven::MavenKind;
pub use pypi::PypiKind;

use crate::config::{ArtifactType, MigrateConfig};
use crate::error::Result;
use crate::inventory::{Coordinate, Payload, SourceEntry, TransferUnit};

/// Shape of the inventory a kind produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// group → artifact → version → file
    Hierarchical,
    /// One set of units
    Flat,
}

/// Path layout of destination repository URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLayout {
    /// `/repository/{project}/{repo}`
    Nested,
    /// `/{project}/{repo}`
    Direct,
}

/// Format-specific behaviour plugged into the pipeline
pub trait ArtifactKind: Send + Sync {
    /// Artifact type handled
    fn artifact_type(&self) -> ArtifactType;

    fn layout(&self) -> Layout;

    fn path_layout(&self) -> PathLayout {
        PathLayout::Direct
    }

    /// Filter applied before classification; rejected entries are not counted
    fn accepts(&self, _entry: &SourceEntry) -> bool {
        true
    }

    /// Map an entry to its coordinate
    fn classify(&self, entry: &SourceEntry) -> Result<Coordinate>;

    /// Key the destination reports for this coordinate's version, if any
    fn identity_key(&self, coordinate: &Coordinate) -> Option<String>;

    /// Key the destination reports for this exact file, if any
    fn file_key(&self, _unit: &TransferUnit) -> Option<String> {
        None
    }

    /// Whether the existence check needs the destination's file listing
    fn uses_file_existence(&self) -> bool {
        false
    }

    /// Path of the unit below the destination repository URL
    fn destination_path(&self, entry: &SourceEntry, _coordinate: &Coordinate) -> String {
        entry.relative_path.trim_matches('/').to_string()
    }

    fn payload(&self, _entry: &SourceEntry, _coordinate: &Coordinate) -> Result<Payload> {
        Ok(Payload::Raw)
    }

    /// Default dispatch order policy
    fn largest_first(&self) -> bool {
        false
    }

    /// Build the transfer unit for an entry
    fn unit(&self, entry: &SourceEntry) -> Result<TransferUnit> {
        let coordinate = self.classify(entry)?;
        Ok(TransferUnit {
            destination_path: self.destination_path(entry, &coordinate),
            payload: self.payload(entry, &coordinate)?,
            source: entry.location.clone(),
            size: entry.size,
            coordinate,
        })
    }
}

/// Strategy for an artifact type
pub fn for_type(kind: ArtifactType, config: &MigrateConfig) -> Box<dyn ArtifactKind> {
    match kind {
        ArtifactType::Maven => Box::new(MavenKind),
        ArtifactType::Generic => Box::new(GenericKind::new(config.prefix.clone())),
        ArtifactType::Pypi => Box::new(PypiKind),
        ArtifactType::Composer => Box::new(ComposerKind),
    }
}
