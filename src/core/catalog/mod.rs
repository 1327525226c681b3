//! # Catalog Module
//!
//! Walks a directory tree and brings the index up to date with the media
//! files it contains.
//!
//! ## Incremental by path
//! A path already present in the index is never re-hashed. Rescans only
//! fill in a media kind or capture time the record is still missing, so
//! running the cataloger twice over an unchanged tree writes nothing.
//!
//! ## Batching
//! Writes are staged and committed in transactions of
//! [`CatalogConfig::batch_size`] records and at the end of every directory.
//! An interrupted run keeps everything committed before the interruption.
//!
//! ## Example
//! ```rust,ignore
//! use mediatool::core::catalog::{CatalogConfig, Cataloger};
//! use mediatool::core::index::SqliteIndex;
//!
//! let index = SqliteIndex::open(Path::new("catalog.db"))?;
//! let report = Cataloger::new(&index, CatalogConfig::default()).run(Path::new("/photos"))?;
//! println!("{} added, {} skipped", report.added, report.skipped);
//! ```

mod cataloger;
mod scan;

pub use cataloger::Cataloger;

use crate::error::FileError;
use crate::events::CatalogSummary;

/// Default number of staged writes per index transaction
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Configuration for a catalog run
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Staged writes per index transaction
    pub batch_size: usize,
    /// Catalog video files as well as images
    pub include_video: bool,
    /// Include hidden files and directories
    pub include_hidden: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Fingerprint new files within a directory on the rayon pool
    pub parallel: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            include_video: false,
            include_hidden: false,
            follow_symlinks: false,
            parallel: true,
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size (clamped to at least 1)
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn include_video(mut self, include: bool) -> Self {
        self.include_video = include;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Outcome of a catalog run
#[derive(Debug, Default)]
pub struct CatalogReport {
    /// Identifier of this run, also attached to its tracing span
    pub run_id: String,
    /// Media files considered
    pub files_seen: usize,
    /// New records written
    pub added: usize,
    /// Existing records that had a kind or capture time backfilled
    pub updated: usize,
    /// Existing records left as they were
    pub unchanged: usize,
    /// Files that could not be cataloged
    pub skipped: usize,
    /// Why each skipped file was skipped
    pub errors: Vec<FileError>,
    /// Index transactions committed
    pub batches_committed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl CatalogReport {
    /// Totals in the shape sent with [`crate::events::CatalogEvent::Completed`]
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            files_seen: self.files_seen,
            added: self.added,
            updated: self.updated,
            skipped: self.skipped,
            duration_ms: self.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.batch_size, 20);
        assert!(!config.include_video);
        assert!(!config.include_hidden);
        assert!(config.parallel);
    }

    #[test]
    fn batch_size_never_zero() {
        assert_eq!(CatalogConfig::new().batch_size(0).batch_size, 1);
    }
}
