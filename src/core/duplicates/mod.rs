//! # Duplicates Module
//!
//! Reports sets of catalog records that share a content fingerprint.
//!
//! Two files are duplicates when their SHA-256 digests are equal; there is
//! no similarity threshold. A fingerprint is reported exactly when two or
//! more records carry it.

use crate::core::index::{FileIndex, FileRecord, IndexStats};
use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All records sharing one fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSet {
    /// The shared content fingerprint
    pub fingerprint: String,
    /// Members ordered by path
    pub members: Vec<FileRecord>,
}

impl DuplicateSet {
    /// Number of copies beyond the first
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Bytes freed by keeping a single copy
    pub fn reclaimable_bytes(&self) -> u64 {
        let size = self.members.iter().map(|m| m.size).max().unwrap_or(0);
        size * self.duplicate_count() as u64
    }

    /// Member paths, ordered
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }
}

/// Read-only duplicate queries over an index
pub struct DuplicateGrouper<'a> {
    index: &'a dyn FileIndex,
}

impl<'a> DuplicateGrouper<'a> {
    pub fn new(index: &'a dyn FileIndex) -> Self {
        Self { index }
    }

    /// Fingerprints carried by two or more records, ascending
    pub fn duplicate_fingerprints(&self) -> Result<Vec<String>, IndexError> {
        self.index.duplicate_fingerprints()
    }

    /// Current member paths for a fingerprint, ascending
    pub fn members(&self, fingerprint: &str) -> Result<Vec<PathBuf>, IndexError> {
        let mut paths: Vec<PathBuf> = self
            .index
            .records_with_fingerprint(fingerprint)?
            .into_iter()
            .map(|r| r.path)
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Every duplicate set, read from a single snapshot of the index
    pub fn groups(&self) -> Result<Vec<DuplicateSet>, IndexError> {
        let mut groups: Vec<DuplicateSet> = Vec::new();

        for record in self.index.duplicate_records()? {
            match groups.last_mut() {
                Some(group) if group.fingerprint == record.fingerprint => {
                    group.members.push(record)
                }
                _ => groups.push(DuplicateSet {
                    fingerprint: record.fingerprint.clone(),
                    members: vec![record],
                }),
            }
        }

        Ok(groups)
    }

    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        self.index.stats()
    }
}
