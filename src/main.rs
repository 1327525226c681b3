//! # mediatool CLI
//!
//! Command-line interface for the media catalog.
//!
//! ## Usage
//! ```bash
//! mediatool catalog ~/Photos
//! mediatool dupes --output json
//! mediatool consolidate --keep ~/Photos/a.jpg ~/Photos/a.jpg ~/Backup/a.jpg --dry-run
//! ```

mod cli;

use mediatool::Result;

fn main() -> Result<()> {
    cli::run()
}
