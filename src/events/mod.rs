//! # Events Module
//!
//! Progress reporting for cataloging and consolidation.
//!
//! The cataloger and the consolidation engine never print or prompt. They
//! emit events through an [`EventSender`] handed to them by the caller, and
//! any front end (CLI, web view, test) subscribes through the matching
//! [`EventReceiver`].
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Catalog(CatalogEvent::FileAdded { path }) = event {
//!             println!("added {}", path.display());
//!         }
//!     }
//! });
//!
//! Cataloger::new(&index, CatalogConfig::default()).run_with_events(root, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
