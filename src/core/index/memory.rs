//! In-memory index backend for testing.

use super::{FileIndex, FileRecord, IndexStats};
use crate::error::IndexError;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory catalog index
///
/// Useful for testing and one-off runs where persistence isn't needed.
pub struct InMemoryIndex {
    records: RwLock<BTreeMap<PathBuf, FileRecord>>,
}

impl InMemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<PathBuf, FileRecord>>, IndexError> {
        self.records.read().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<PathBuf, FileRecord>>, IndexError> {
        self.records.write().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn fingerprint_counts(records: &BTreeMap<PathBuf, FileRecord>) -> HashMap<&str, usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records.values() {
            *counts.entry(record.fingerprint.as_str()).or_default() += 1;
        }
        counts
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FileIndex for InMemoryIndex {
    fn get(&self, path: &Path) -> Result<Option<FileRecord>, IndexError> {
        Ok(self.read()?.get(path).cloned())
    }

    fn upsert_batch(&self, records: &[FileRecord]) -> Result<(), IndexError> {
        for record in records {
            record.validate()?;
        }

        let mut stored = self.write()?;
        for record in records {
            stored.insert(record.path.clone(), record.clone());
        }
        Ok(())
    }

    fn delete_batch(&self, paths: &[PathBuf]) -> Result<usize, IndexError> {
        let mut stored = self.write()?;
        Ok(paths
            .iter()
            .filter(|path| stored.remove(path.as_path()).is_some())
            .count())
    }

    fn relocate(&self, from: &Path, to: &Path) -> Result<bool, IndexError> {
        let mut stored = self.write()?;

        match stored.remove(from) {
            Some(mut record) => {
                record.path = to.to_path_buf();
                stored.insert(to.to_path_buf(), record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn duplicate_fingerprints(&self) -> Result<Vec<String>, IndexError> {
        let stored = self.read()?;

        let mut fingerprints: Vec<String> = Self::fingerprint_counts(&stored)
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(fp, _)| fp.to_string())
            .collect();
        fingerprints.sort();

        Ok(fingerprints)
    }

    fn records_with_fingerprint(&self, fingerprint: &str) -> Result<Vec<FileRecord>, IndexError> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.fingerprint == fingerprint)
            .cloned()
            .collect())
    }

    fn duplicate_records(&self) -> Result<Vec<FileRecord>, IndexError> {
        let stored = self.read()?;
        let counts = Self::fingerprint_counts(&stored);

        let mut records: Vec<FileRecord> = stored
            .values()
            .filter(|r| counts.get(r.fingerprint.as_str()).copied().unwrap_or(0) > 1)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.fingerprint
                .cmp(&b.fingerprint)
                .then_with(|| a.path.cmp(&b.path))
        });

        Ok(records)
    }

    fn paths(&self) -> Result<Vec<PathBuf>, IndexError> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn stats(&self) -> Result<IndexStats, IndexError> {
        let stored = self.read()?;

        let mut sizes: HashMap<&str, (usize, u64)> = HashMap::new();
        for record in stored.values() {
            let entry = sizes.entry(record.fingerprint.as_str()).or_default();
            entry.0 += 1;
            entry.1 = entry.1.max(record.size);
        }

        let shared = sizes.values().filter(|(count, _)| *count > 1);

        Ok(IndexStats {
            total_records: stored.len(),
            total_bytes: stored.values().map(|r| r.size).sum(),
            distinct_fingerprints: sizes.len(),
            duplicate_sets: shared.clone().count(),
            redundant_records: shared.clone().map(|(count, _)| count - 1).sum(),
            reclaimable_bytes: shared.map(|(count, size)| (*count as u64 - 1) * size).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::test_support::{fp, image};

    #[test]
    fn miss_returns_none() {
        let index = InMemoryIndex::new();
        assert!(index.get(Path::new("/nonexistent.jpg")).unwrap().is_none());
    }

    #[test]
    fn upsert_then_get() {
        let index = InMemoryIndex::new();
        index.upsert(&image("/a.jpg", 3, 'a')).unwrap();

        let record = index.get(Path::new("/a.jpg")).unwrap().unwrap();
        assert_eq!(record.size, 3);
        assert_eq!(record.fingerprint, fp('a'));
    }

    #[test]
    fn rejects_invalid_batch_atomically() {
        let index = InMemoryIndex::new();
        let result = index.upsert_batch(&[
            image("/a.jpg", 3, 'a'),
            FileRecord::new("/b.jpg", 3, "ABC"),
        ]);

        assert!(result.is_err());
        assert!(index.paths().unwrap().is_empty());
    }

    #[test]
    fn duplicate_queries_agree_with_stats() {
        let index = InMemoryIndex::new();
        index
            .upsert_batch(&[
                image("/x/2.jpg", 4, 'b'),
                image("/x/1.jpg", 4, 'b'),
                image("/x/3.jpg", 7, 'c'),
            ])
            .unwrap();

        assert_eq!(index.duplicate_fingerprints().unwrap(), vec![fp('b')]);

        let records = index.duplicate_records().unwrap();
        let paths: Vec<_> = records.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/x/1.jpg"), PathBuf::from("/x/2.jpg")]);

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.total_bytes, 15);
        assert_eq!(stats.duplicate_sets, 1);
        assert_eq!(stats.redundant_records, 1);
        assert_eq!(stats.reclaimable_bytes, 4);
    }

    #[test]
    fn relocate_moves_record() {
        let index = InMemoryIndex::new();
        index
            .upsert_batch(&[image("/a.jpg", 1, 'a'), image("/b.jpg", 2, 'b')])
            .unwrap();

        assert!(index.relocate(Path::new("/a.jpg"), Path::new("/b.jpg")).unwrap());

        assert!(index.get(Path::new("/a.jpg")).unwrap().is_none());
        let moved = index.get(Path::new("/b.jpg")).unwrap().unwrap();
        assert_eq!(moved.path, PathBuf::from("/b.jpg"));
        assert_eq!(moved.fingerprint, fp('a'));
    }

    #[test]
    fn delete_reports_existence() {
        let index = InMemoryIndex::new();
        index.upsert(&image("/a.jpg", 1, 'a')).unwrap();

        assert!(index.delete(Path::new("/a.jpg")).unwrap());
        assert!(!index.delete(Path::new("/a.jpg")).unwrap());
    }
}
