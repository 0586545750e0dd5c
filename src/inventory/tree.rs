//! Inventory containers
//!
//! `ArtifactTree` nests group → artifact → version → file and is used for
//! hierarchical formats. `FlatSet` keeps units in listing order, keyed by
//! destination path. Both refuse a second unit for a file they already hold.

use crate::inventory::{Coordinate, TransferUnit};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

type Files = BTreeMap<String, TransferUnit>;
type Versions = BTreeMap<String, Files>;
type Artifacts = BTreeMap<String, Versions>;

/// group → artifact → version → filename → unit
#[derive(Debug, Clone, Default)]
pub struct ArtifactTree {
    groups: BTreeMap<String, Artifacts>,
    file_count: usize,
}

impl ArtifactTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit; returns false if the same file is already present
    /// or the unit is not hierarchical.
    pub fn insert(&mut self, unit: TransferUnit) -> bool {
        let (group, artifact, version, filename) = match &unit.coordinate {
            Coordinate::Hierarchical {
                group,
                artifact,
                version,
                filename,
            } => (group.clone(), artifact.clone(), version.clone(), filename.clone()),
            _ => return false,
        };

        let files = self
            .groups
            .entry(group)
            .or_default()
            .entry(artifact)
            .or_default()
            .entry(version)
            .or_default();

        if files.contains_key(&filename) {
            return false;
        }
        files.insert(filename, unit);
        self.file_count += 1;
        true
    }

    /// Remove artifacts whose only version is the metadata sentinel, then
    /// groups left empty. Returns the number of files removed.
    pub fn prune_orphan_metadata(&mut self) -> usize {
        let mut removed = 0;

        for artifacts in self.groups.values_mut() {
            artifacts.retain(|_, versions| {
                let orphan = versions.len() == 1
                    && versions
                        .keys()
                        .next()
                        .is_some_and(|v| v == super::METADATA_VERSION);
                if orphan {
                    removed += versions.values().map(BTreeMap::len).sum::<usize>();
                }
                !orphan
            });
        }
        self.groups.retain(|_, artifacts| !artifacts.is_empty());

        self.file_count -= removed;
        removed
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn artifact_count(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn version_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        match coordinate {
            Coordinate::Hierarchical {
                group,
                artifact,
                version,
                filename,
            } => self
                .groups
                .get(group)
                .and_then(|a| a.get(artifact))
                .and_then(|v| v.get(version))
                .is_some_and(|f| f.contains_key(filename)),
            _ => false,
        }
    }

    /// Units in group/artifact/version/file order
    pub fn units(&self) -> impl Iterator<Item = &TransferUnit> {
        self.groups
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
    }
}

/// Units keyed by destination path, in insertion order
#[derive(Debug, Clone, Default)]
pub struct FlatSet {
    units: Vec<TransferUnit>,
    keys: HashSet<String>,
}

impl FlatSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit; returns false if its destination path is taken
    pub fn insert(&mut self, unit: TransferUnit) -> bool {
        if !self.keys.insert(unit.destination_path.clone()) {
            return false;
        }
        self.units.push(unit);
        true
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> impl Iterator<Item = &TransferUnit> {
        self.units.iter()
    }
}

/// Derived inventory counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventoryCounts {
    pub groups: usize,
    pub artifacts: usize,
    pub versions: usize,
    pub files: usize,
    pub bytes: u64,
}

/// All transfer candidates of one run
#[derive(Debug, Clone)]
pub enum Inventory {
    Hierarchical(ArtifactTree),
    Flat(FlatSet),
}

impl Inventory {
    pub fn file_count(&self) -> usize {
        match self {
            Self::Hierarchical(tree) => tree.file_count(),
            Self::Flat(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    pub fn total_size(&self) -> u64 {
        self.iter().map(|u| u.size).sum()
    }

    pub fn counts(&self) -> InventoryCounts {
        match self {
            Self::Hierarchical(tree) => InventoryCounts {
                groups: tree.group_count(),
                artifacts: tree.artifact_count(),
                versions: tree.version_count(),
                files: tree.file_count(),
                bytes: self.total_size(),
            },
            Self::Flat(set) => {
                let versions: HashSet<String> = set.units().map(|u| u.display_name()).collect();
                InventoryCounts {
                    versions: versions.len(),
                    files: set.len(),
                    bytes: self.total_size(),
                    ..Default::default()
                }
            }
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &TransferUnit> + '_> {
        match self {
            Self::Hierarchical(tree) => Box::new(tree.units()),
            Self::Flat(set) => Box::new(set.units()),
        }
    }

    /// Owned copy of every unit, in inventory order
    pub fn units(&self) -> Vec<TransferUnit> {
        self.iter().cloned().collect()
    }

    /// Write the inventory as a text table
    pub fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let rows: Vec<[String; 3]> = self
            .iter()
            .map(|u| {
                [
                    u.display_name(),
                    u.coordinate.filename().to_string(),
                    humansize::format_size(u.size, humansize::BINARY),
                ]
            })
            .collect();

        let headers = ["Artifact", "File", "Size"];
        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |w: &mut dyn Write, cells: [&str; 3]| -> io::Result<()> {
            writeln!(
                w,
                "{:<a$}  {:<b$}  {:>c$}",
                cells[0],
                cells[1],
                cells[2],
                a = widths[0],
                b = widths[1],
                c = widths[2]
            )
        };

        line(&mut *w, headers)?;
        for row in &rows {
            line(&mut *w, [row[0].as_str(), row[1].as_str(), row[2].as_str()])?;
        }

        let counts = self.counts();
        match self {
            Self::Hierarchical(_) => writeln!(
                w,
                "\n{} groups, {} artifacts, {} versions, {} files ({})",
                counts.groups,
                counts.artifacts,
                counts.versions,
                counts.files,
                humansize::format_size(counts.bytes, humansize::BINARY)
            ),
            Self::Flat(_) => writeln!(
                w,
                "\n{} files ({})",
                counts.files,
                humansize::format_size(counts.bytes, humansize::BINARY)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Payload, SourceLocation, METADATA_VERSION};

    fn unit(group: &str, artifact: &str, version: &str, file: &str) -> TransferUnit {
        let path = format!("{}/{}/{}/{}", group.replace('.', "/"), artifact, version, file);
        TransferUnit {
            coordinate: Coordinate::hierarchical(group, artifact, version, file),
            source: SourceLocation::Remote(format!("http://src/{}", path)),
            destination_path: path,
            size: 1,
            payload: Payload::Raw,
        }
    }

    #[test]
    fn test_tree_dedup_is_per_file() {
        let mut tree = ArtifactTree::new();
        assert!(tree.insert(unit("g", "a", "1", "a-1.jar")));
        assert!(!tree.insert(unit("g", "a", "1", "a-1.jar")));
        assert!(tree.insert(unit("g", "a", "1", "a-1-sources.jar")));
        assert_eq!(tree.file_count(), 2);
        assert_eq!(tree.version_count(), 1);
    }

    #[test]
    fn test_prune_orphan_metadata() {
        let mut tree = ArtifactTree::new();
        tree.insert(unit("g1", "a1", "1.0", "a1-1.0.jar"));
        tree.insert(unit("g1", "a1", METADATA_VERSION, "maven-metadata.xml"));
        tree.insert(unit("g2", "orphan", METADATA_VERSION, "maven-metadata.xml"));
        tree.insert(unit("g2", "orphan", METADATA_VERSION, "maven-metadata.xml.sha1"));
        assert_eq!(tree.file_count(), 4);

        let removed = tree.prune_orphan_metadata();
        assert_eq!(removed, 2);
        assert_eq!(tree.file_count(), 2);
        assert_eq!(tree.group_count(), 1);
        assert_eq!(tree.artifact_count(), 1);
        assert!(tree.contains(&Coordinate::hierarchical("g1", "a1", METADATA_VERSION, "maven-metadata.xml")));
        assert!(!tree.contains(&Coordinate::hierarchical("g2", "orphan", METADATA_VERSION, "maven-metadata.xml")));
        assert_eq!(tree.units().count(), tree.file_count());
    }

    #[test]
    fn test_flat_set_keeps_order() {
        let mut set = FlatSet::new();
        let mut b = unit("g", "a", "1", "b");
        b.coordinate = Coordinate::Path { path: "b".into() };
        b.destination_path = "b".into();
        let mut a = b.clone();
        a.coordinate = Coordinate::Path { path: "a".into() };
        a.destination_path = "a".into();

        assert!(set.insert(b.clone()));
        assert!(set.insert(a));
        assert!(!set.insert(b));
        let order: Vec<_> = set.units().map(|u| u.destination_path.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_render_lists_every_unit() {
        let mut tree = ArtifactTree::new();
        tree.insert(unit("org.acme", "lib", "1.0", "lib-1.0.jar"));
        tree.insert(unit("org.acme", "lib", "1.0", "lib-1.0.pom"));
        let inventory = Inventory::Hierarchical(tree);

        let mut out = Vec::new();
        inventory.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("lib-1.0.jar"));
        assert!(text.contains("lib-1.0.pom"));
        assert!(text.contains("1 groups, 1 artifacts, 1 versions, 2 files"));
    }
}
