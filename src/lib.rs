//! # mediatool
//!
//! Catalogs photos and videos by content fingerprint and consolidates
//! byte-identical copies.
//!
//! ## Core Philosophy
//! - **Content decides** - two files are duplicates only if their SHA-256 digests match
//! - **Incremental** - a cataloged path is never hashed twice
//! - **Nothing silent** - every deletion is logged before it happens, and dry runs touch nothing
//!
//! ## Architecture
//! - `core` - Cataloging, duplicate grouping and consolidation
//! - `events` - Progress reporting over channels
//! - `error` - Typed errors with path context
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{MediaToolError, Result};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the library
///
/// Honors `RUST_LOG` when set, otherwise filters with `default_directive`
/// (e.g. `"info"` or `"mediatool=debug"`). Logs go to stderr. Calling this
/// more than once is harmless.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
