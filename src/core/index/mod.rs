//! # Index Module
//!
//! The persistent catalog: one [`FileRecord`] per cataloged path.
//!
//! Components never talk to a database directly; they depend on the
//! [`FileIndex`] repository trait. Two backends ship with the crate:
//! - `SqliteIndex` - persistent storage using SQLite
//! - `InMemoryIndex` - for tests and throwaway runs

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;
pub use traits::FileIndex;

use crate::core::fingerprint::is_fingerprint;
use crate::core::media::MediaKind;
use crate::error::IndexError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A cataloged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path, unique across the index
    pub path: PathBuf,
    /// Size in bytes when the content was fingerprinted
    pub size: u64,
    /// Hex SHA-256 of the content
    pub fingerprint: String,
    /// Media kind; absent on records written before kinds were tracked
    pub kind: Option<MediaKind>,
    /// Embedded capture time, images only
    pub capture_time: Option<NaiveDateTime>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, size: u64, fingerprint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size,
            fingerprint: fingerprint.into(),
            kind: None,
            capture_time: None,
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_capture_time(mut self, capture_time: Option<NaiveDateTime>) -> Self {
        self.capture_time = capture_time;
        self
    }

    /// Check the record invariants before it is written
    pub fn validate(&self) -> Result<(), IndexError> {
        let invalid = |reason: &str| IndexError::InvalidRecord {
            path: self.path.to_string_lossy().into_owned(),
            reason: reason.to_string(),
        };

        if !is_fingerprint(&self.fingerprint) {
            return Err(invalid("fingerprint is not a 64-character hex digest"));
        }
        if self.capture_time.is_some() && self.kind != Some(MediaKind::Image) {
            return Err(invalid("capture time on a non-image record"));
        }
        Ok(())
    }
}

/// Aggregate figures for an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of records
    pub total_records: usize,
    /// Sum of record sizes
    pub total_bytes: u64,
    /// Number of distinct fingerprints
    pub distinct_fingerprints: usize,
    /// Fingerprints shared by two or more records
    pub duplicate_sets: usize,
    /// Records beyond the first in each duplicate set
    pub redundant_records: usize,
    /// Bytes freed if every duplicate set kept one copy
    pub reclaimable_bytes: u64,
}


#[cfg(test)]
mod tests {
    use super::test_support::{fp, image};
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn valid_image_record() {
        let taken = NaiveDate::from_ymd_opt(2021, 6, 12)
            .unwrap()
            .and_hms_opt(9, 14, 20)
            .unwrap();
        let record = image("/photos/a.jpg", 10, 'a').with_capture_time(Some(taken));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn capture_time_requires_image_kind() {
        let taken = NaiveDate::from_ymd_opt(2021, 6, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let record = FileRecord::new("/clips/a.mov", 10, fp('b'))
            .with_kind(MediaKind::Video)
            .with_capture_time(Some(taken));

        assert!(matches!(
            record.validate(),
            Err(IndexError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn fingerprint_must_be_hex_digest() {
        let record = FileRecord::new("/photos/a.jpg", 10, "not-a-digest");
        assert!(record.validate().is_err());
    }
}
