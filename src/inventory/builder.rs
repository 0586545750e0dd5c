//! Inventory builder
//!
//! Classifies source entries, drops the ones the destination already holds
//! and collects the rest into an `Inventory`.

use crate::inventory::{ArtifactTree, FlatSet, Inventory, SourceEntry, TransferUnit};
use crate::kind::{ArtifactKind, Layout};
use std::collections::HashSet;

/// What the destination already holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistenceSet {
    /// Version identities (`group:artifact:version`, `path:latest`, ...)
    versions: HashSet<String>,
    /// Repository-relative file paths
    files: HashSet<String>,
}

impl ExistenceSet {
    pub fn new(versions: HashSet<String>, files: HashSet<String>) -> Self {
        Self { versions, files }
    }

    pub fn contains_version(&self, key: &str) -> bool {
        self.versions.contains(key)
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains(path.trim_start_matches('/'))
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Result of building an inventory
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub inventory: Inventory,
    /// Entries accepted by the kind filter and classified
    pub scanned: usize,
    /// Units left in the inventory
    pub needed: usize,
}

/// Builds an `Inventory` from a listing
pub struct InventoryBuilder<'a> {
    kind: &'a dyn ArtifactKind,
    existence: Option<&'a ExistenceSet>,
    force: bool,
    max_files: Option<usize>,
}

impl<'a> InventoryBuilder<'a> {
    pub fn new(kind: &'a dyn ArtifactKind) -> Self {
        Self {
            kind,
            existence: None,
            force: false,
            max_files: None,
        }
    }

    /// Filter against what the destination already holds
    pub fn with_existence(mut self, existence: Option<&'a ExistenceSet>) -> Self {
        self.existence = existence;
        self
    }

    /// Keep every unit regardless of existence
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop accepting units after this many
    pub fn max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    /// Whether a unit still has to be transferred
    pub fn is_needed(&self, unit: &TransferUnit) -> bool {
        if self.force {
            return true;
        }
        let Some(existing) = self.existence else {
            return true;
        };

        let identity = self.kind.identity_key(&unit.coordinate);
        if let Some(key) = &identity {
            if !existing.contains_version(key) {
                return true;
            }
        }

        match self.kind.file_key(unit) {
            Some(path) => !existing.contains_file(&path),
            // nothing left to check: a known version with no file key is present
            None => identity.is_none(),
        }
    }

    pub fn build<I>(&self, entries: I) -> BuildOutcome
    where
        I: IntoIterator<Item = SourceEntry>,
    {
        let mut inventory = match self.kind.layout() {
            Layout::Hierarchical => Inventory::Hierarchical(ArtifactTree::new()),
            Layout::Flat => Inventory::Flat(FlatSet::new()),
        };
        let mut scanned = 0;
        let mut limit_logged = false;

        for entry in entries {
            if !self.kind.accepts(&entry) {
                continue;
            }

            let unit = match self.kind.unit(&entry) {
                Ok(unit) => unit,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", entry.relative_path, e);
                    continue;
                }
            };
            scanned += 1;

            if !self.is_needed(&unit) {
                continue;
            }

            if let Some(max) = self.max_files {
                if inventory.file_count() >= max {
                    if !limit_logged {
                        tracing::info!("Reached the limit of {} files, ignoring the rest", max);
                        limit_logged = true;
                    }
                    continue;
                }
            }

            let inserted = match &mut inventory {
                Inventory::Hierarchical(tree) => tree.insert(unit),
                Inventory::Flat(set) => set.insert(unit),
            };
            if !inserted {
                tracing::debug!("Duplicate entry {}", entry.relative_path);
            }
        }

        if let Inventory::Hierarchical(tree) = &mut inventory {
            let pruned = tree.prune_orphan_metadata();
            if pruned > 0 {
                tracing::debug!("Dropped {} metadata files of artifacts with no versions to migrate", pruned);
            }
        }

        let needed = inventory.file_count();
        tracing::info!(
            "Repository file count is {}, need to migrate {}",
            scanned,
            needed
        );

        BuildOutcome {
            inventory,
            scanned,
            needed,
        }
    }
}
