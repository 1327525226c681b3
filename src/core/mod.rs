//! # Core Module
//!
//! The UI-agnostic catalog engine.
//!
//! ## Modules
//! - `media` - Classifies paths as image, video or unknown
//! - `fingerprint` - SHA-256 content fingerprints
//! - `metadata` - Reads embedded capture times from EXIF
//! - `naming` - Canonical capture-time file names
//! - `index` - The persistent path to record store
//! - `catalog` - Walks directory trees into the index
//! - `duplicates` - Groups records sharing a fingerprint
//! - `consolidate` - Reduces a duplicate set to a single file

pub mod catalog;
pub mod consolidate;
pub mod duplicates;
pub mod fingerprint;
pub mod index;
pub mod media;
pub mod metadata;
pub mod naming;

// Re-export commonly used types
pub use catalog::{CatalogConfig, CatalogReport, Cataloger};
pub use consolidate::{ConsolidationEngine, ConsolidationPlan, ConsolidationReport, PromoteMode};
pub use duplicates::{DuplicateGrouper, DuplicateSet};
pub use index::{FileIndex, FileRecord, InMemoryIndex, IndexStats, SqliteIndex};
pub use media::MediaKind;
pub use naming::NamingOptions;
