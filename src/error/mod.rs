//! # Error Module
//!
//! Error types for cataloging and consolidating media files.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, raw values, what went wrong
//! - **Per-file errors are values** - the cataloger records them and keeps walking

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum MediaToolError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Consolidation error: {0}")]
    Consolidate(#[from] ConsolidateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while hashing file content
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while reading an embedded capture time
///
/// Corrupt or unsupported metadata containers are not errors; they
/// degrade to "no capture time" with a logged warning.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to open image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized capture time format: {value:?}")]
    UnrecognizedFormat { value: String },
}

/// Errors from the catalog index store
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open index database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Index query failed: {0}")]
    QueryFailed(String),

    #[error("Index corruption detected at {path}. Delete this file and re-run the catalog.")]
    Corrupted { path: PathBuf },

    #[error("Invalid record for {path}: {reason}")]
    InvalidRecord { path: String, reason: String },
}

impl From<rusqlite::Error> for IndexError {
    fn from(err: rusqlite::Error) -> Self {
        IndexError::QueryFailed(err.to_string())
    }
}

/// Fatal errors that stop a catalog run
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Failed to walk catalog root {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// A single file the cataloger skipped
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error("{path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },

    #[error("Failed to read directory entry under {path}: {reason}")]
    Walk { path: PathBuf, reason: String },
}

impl FileError {
    /// Path of the file that was skipped
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileError::Stat { path, .. }
            | FileError::Metadata { path, .. }
            | FileError::Walk { path, .. } => path,
            FileError::Fingerprint(FingerprintError::Io { path, .. }) => path,
        }
    }
}

/// Errors from consolidating a duplicate set
#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("No members to promote onto keeper {keeper}")]
    EmptySet { keeper: PathBuf },

    #[error("Invalid consolidation plan for {keeper}: {reason}")]
    InvalidPlan { keeper: PathBuf, reason: String },

    #[error("Failed to promote {from} to {to}: {source}")]
    Promote {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy of {from} to {to} failed verification: expected {expected}, got {actual}")]
    VerificationFailed {
        from: PathBuf,
        to: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Removed {removed} file(s) but {} could not be deleted (first: {})", .failed.len(), first_failure(.failed))]
    IncompleteCleanup {
        removed: usize,
        failed: Vec<(PathBuf, String)>,
    },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

fn first_failure(failed: &[(PathBuf, String)]) -> String {
    failed
        .first()
        .map(|(path, reason)| format!("{}: {}", path.display(), reason))
        .unwrap_or_default()
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, MediaToolError>;
