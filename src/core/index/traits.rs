//! Repository trait for the catalog index.

use super::{FileRecord, IndexStats};
use crate::error::IndexError;
use std::path::{Path, PathBuf};

/// Storage for [`FileRecord`]s keyed by path
///
/// Every method is one unit of work: batch methods apply all of their
/// changes in a single transaction or none of them.
pub trait FileIndex: Send + Sync {
    /// Look up the record for a path
    fn get(&self, path: &Path) -> Result<Option<FileRecord>, IndexError>;

    /// Insert or replace records in one transaction
    fn upsert_batch(&self, records: &[FileRecord]) -> Result<(), IndexError>;

    /// Insert or replace a single record
    fn upsert(&self, record: &FileRecord) -> Result<(), IndexError> {
        self.upsert_batch(std::slice::from_ref(record))
    }

    /// Delete records by path in one transaction
    ///
    /// Returns how many records existed and were deleted.
    fn delete_batch(&self, paths: &[PathBuf]) -> Result<usize, IndexError>;

    /// Delete a single record, returning whether it existed
    fn delete(&self, path: &Path) -> Result<bool, IndexError> {
        Ok(self.delete_batch(&[path.to_path_buf()])? > 0)
    }

    /// Move the record at `from` to `to`, replacing any record at `to`
    ///
    /// Returns `false` (and changes nothing) when `from` has no record.
    fn relocate(&self, from: &Path, to: &Path) -> Result<bool, IndexError>;

    /// Fingerprints shared by two or more records, ascending
    fn duplicate_fingerprints(&self) -> Result<Vec<String>, IndexError>;

    /// All records with the given fingerprint, ordered by path
    fn records_with_fingerprint(&self, fingerprint: &str) -> Result<Vec<FileRecord>, IndexError>;

    /// Every record whose fingerprint is shared, ordered by fingerprint
    /// then path, read from a single snapshot
    fn duplicate_records(&self) -> Result<Vec<FileRecord>, IndexError>;

    /// All indexed paths
    fn paths(&self) -> Result<Vec<PathBuf>, IndexError>;

    /// Aggregate statistics
    fn stats(&self) -> Result<IndexStats, IndexError>;

    /// Find (and unless `dry_run`, delete) records whose file is gone
    fn prune_missing(&self, dry_run: bool) -> Result<Vec<PathBuf>, IndexError> {
        let missing: Vec<PathBuf> = self
            .paths()?
            .into_iter()
            .filter(|path| !path.is_file())
            .collect();

        if !dry_run && !missing.is_empty() {
            self.delete_batch(&missing)?;
        }

        Ok(missing)
    }
}
