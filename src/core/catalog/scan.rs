//! Building and backfilling records for individual files.

use crate::core::fingerprint::fingerprint_file;
use crate::core::index::FileRecord;
use crate::core::media::MediaKind;
use crate::core::metadata::extract_capture_time;
use crate::error::FileError;
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

/// Build a complete record for a file the index has never seen
pub(crate) fn scan_new(path: &Path, kind: MediaKind) -> Result<FileRecord, FileError> {
    let size = fs::metadata(path)
        .map_err(|source| FileError::Stat {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    let fingerprint = fingerprint_file(path)?;

    let capture_time = match kind {
        MediaKind::Image => read_capture_time(path)?,
        _ => None,
    };

    Ok(FileRecord::new(path, size, fingerprint)
        .with_kind(kind)
        .with_capture_time(capture_time))
}

/// Fill in a missing kind or capture time on an existing record
///
/// Returns `None` when there is nothing to change. Content is never
/// re-read; size and fingerprint stay as first recorded.
pub(crate) fn backfill(
    existing: &FileRecord,
    kind: MediaKind,
) -> Result<Option<FileRecord>, FileError> {
    let mut updated = existing.clone();

    if updated.kind.is_none() {
        updated.kind = Some(kind);
    }

    if updated.capture_time.is_none() && updated.kind == Some(MediaKind::Image) {
        updated.capture_time = read_capture_time(&existing.path)?;
    }

    Ok((updated != *existing).then_some(updated))
}

fn read_capture_time(path: &Path) -> Result<Option<NaiveDateTime>, FileError> {
    extract_capture_time(path).map_err(|source| FileError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}
