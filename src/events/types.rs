//! Event type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the core library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Cataloging a directory tree
    Catalog(CatalogEvent),
    /// Consolidating a duplicate set
    Consolidate(ConsolidateEvent),
}

/// Events from a catalog run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CatalogEvent {
    /// Walk started at `root`
    Started { run_id: String, root: PathBuf },
    /// A directory is about to be processed
    DirectoryEntered { path: PathBuf, files: usize },
    /// A new record was staged
    FileAdded { path: PathBuf },
    /// Missing kind or capture time was backfilled on an existing record
    FileUpdated { path: PathBuf },
    /// Staged records were written to the index
    Committed { records: usize },
    /// A file was skipped; the walk continues
    Error { path: PathBuf, message: String },
    /// Walk finished
    Completed { summary: CatalogSummary },
}

/// Totals reported at the end of a catalog run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub files_seen: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Events from a consolidation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConsolidateEvent {
    /// The removal set has been computed
    Planned {
        keeper: PathBuf,
        promote_from: Option<PathBuf>,
        removals: usize,
        dry_run: bool,
    },
    /// A member was moved onto the keeper path
    Promoted { from: PathBuf, to: PathBuf },
    /// A duplicate is about to be deleted
    Removing { path: PathBuf, dry_run: bool },
    /// A deletion failed; cleanup continues with the next member
    RemoveFailed { path: PathBuf, message: String },
    /// Consolidation finished
    Completed { removed: usize, dry_run: bool },
}
