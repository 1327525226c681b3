//! # Consolidate Module
//!
//! Collapses a duplicate set down to a single file at a chosen path.
//!
//! ## Algorithm
//! 1. Reject a plan that removes its keeper or its promoted member, or
//!    lists a removal twice. Then check that every member and the keeper
//!    exist as regular files. Nothing is touched unless both checks pass.
//! 2. If the keeper is a member, every other member is removed. A keeper
//!    the index never saw gets a record first.
//! 3. Otherwise the lexicographically smallest member is promoted onto the
//!    keeper path (its index record moves with it) and the rest are removed.
//!
//! Every removal is logged before it happens. A dry run logs the same
//! removals and returns the same count without touching disk or index.
//!
//! ## Promotion
//! | Mode         | Operation                                  | Requirement    |
//! |--------------|--------------------------------------------|----------------|
//! | `Rename`     | single `fs::rename`                        | same volume    |
//! | `CopyVerify` | copy, re-fingerprint, compare, delete      | any volumes    |
//!
//! If `CopyVerify` swaps the copy in but cannot delete the source, the
//! keeper and its record are kept and the source is reported in
//! `IncompleteCleanup` like any other failed removal.
//!
//! Disk changes and index commits are not one transaction. A crash
//! between them leaves records for files that no longer exist; `prune`
//! cleans those up.

mod engine;
mod promote;

pub use engine::ConsolidationEngine;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the physical source is moved onto the keeper path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoteMode {
    /// Rename in place (source and keeper on the same volume)
    #[default]
    Rename,
    /// Copy, verify the copy's fingerprint, then delete the source
    CopyVerify,
}

/// What a consolidation will do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationPlan {
    /// Path that survives
    pub keeper: PathBuf,
    /// Member promoted onto the keeper path, when the keeper is not a member
    pub promote_from: Option<PathBuf>,
    /// Members to delete, ordered
    pub removals: Vec<PathBuf>,
}

impl ConsolidationPlan {
    pub fn removal_count(&self) -> usize {
        self.removals.len()
    }
}

/// What a consolidation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub keeper: PathBuf,
    pub promoted_from: Option<PathBuf>,
    /// Files deleted, or that would be deleted on a dry run
    pub removed: Vec<PathBuf>,
    pub dry_run: bool,
}

impl ConsolidationReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}
