//! # Metadata Module
//!
//! Reads the capture time embedded in image EXIF data.
//!
//! ## Lookup
//! - Only JPEG and PNG files are inspected; everything else has no capture time
//! - `DateTimeOriginal` is preferred, the generic `DateTime` tag is the fallback
//! - A file without an EXIF block simply has no capture time
//!
//! ## Failure modes
//! A corrupt or unsupported EXIF container is logged and treated as "no
//! capture time". A tag whose text matches none of the known encodings is
//! an error and is returned to the caller (see [`parse_capture_time`]).

mod datetime;

pub use datetime::{format_capture_time, parse_capture_time, parse_stored_capture_time};

use crate::core::media::mime_type;
use crate::error::MetadataError;
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Whether capture times are read for this path at all
pub fn supports_capture_time(path: &Path) -> bool {
    mime_type(path)
        .map(|mime| mime.ends_with("jpeg") || mime.ends_with("png"))
        .unwrap_or(false)
}

/// Extract the capture time of an image
///
/// Returns `Ok(None)` for unsupported kinds, files without EXIF, files
/// without a date tag, sentinel values, and corrupt metadata (the last
/// with a logged warning).
pub fn extract_capture_time(path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
    if !supports_capture_time(path) {
        return Ok(None);
    }

    let file = File::open(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bufreader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            debug!(path = %path.display(), "No EXIF block");
            return Ok(None);
        }
        Err(exif::Error::Io(source)) if source.kind() != std::io::ErrorKind::UnexpectedEof => {
            return Err(MetadataError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable EXIF metadata, ignoring capture time");
            return Ok(None);
        }
    };

    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY));

    let Some(field) = field else {
        return Ok(None);
    };

    match ascii_value(&field.value) {
        Some(raw) => parse_capture_time(&raw),
        None => {
            warn!(
                path = %path.display(),
                tag = %field.tag,
                "Capture time tag is not ASCII text, ignoring"
            );
            Ok(None)
        }
    }
}

/// Text of an EXIF ASCII value; an empty value reads as ""
fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => match parts.first() {
            Some(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
            None => Some(String::new()),
        },
        _ => None,
    }
}
