//! # Naming Module
//!
//! Recommends a canonical file name for an image from its capture time.
//!
//! `/photos/Rose/IMG_2943.JPG` taken 2021-06-12 09:14:20 becomes
//! `/photos/Rose/20210612_091420.jpg`, or
//! `/photos/Rose/2021/06/12/20210612_091420.jpg` with date folders enabled.
//!
//! Nothing here renames anything, and the recommended path is not checked
//! against files that may already exist there.

use crate::core::media::mime_type;
use crate::core::metadata::extract_capture_time;
use crate::error::MetadataError;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Layout options for recommended names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingOptions {
    /// Nest the file under `YYYY/MM/DD/`
    pub date_folders: bool,
    /// Relocate under this directory instead of the file's own parent
    pub root: Option<PathBuf>,
}

impl NamingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_folders(mut self, enabled: bool) -> Self {
        self.date_folders = enabled;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

/// `YYYYMMDD_HHMMSS`
pub fn filename_stem(capture_time: &NaiveDateTime) -> String {
    capture_time.format("%Y%m%d_%H%M%S").to_string()
}

/// Canonical extension for a path, if it is a JPEG or PNG
pub fn normalized_extension(path: &Path) -> Option<&'static str> {
    match mime_type(path)? {
        mime if mime.ends_with("jpeg") => Some("jpg"),
        mime if mime.ends_with("png") => Some("png"),
        _ => None,
    }
}

fn date_folder(capture_time: &NaiveDateTime) -> PathBuf {
    PathBuf::from(format!("{:04}", capture_time.year()))
        .join(format!("{:02}", capture_time.month()))
        .join(format!("{:02}", capture_time.day()))
}

/// Compute the canonical path for an image taken at `capture_time`
///
/// Returns `None` for anything that is not a JPEG or PNG.
pub fn canonical_path(
    path: &Path,
    capture_time: &NaiveDateTime,
    options: &NamingOptions,
) -> Option<PathBuf> {
    let extension = normalized_extension(path)?;

    let mut target = match &options.root {
        Some(root) => root.clone(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    if options.date_folders {
        target.push(date_folder(capture_time));
    }

    target.push(format!("{}.{}", filename_stem(capture_time), extension));
    Some(target)
}

/// Recommend a canonical path for an image on disk
///
/// Reads the capture time from the file's EXIF data. Returns `Ok(None)`
/// when the file is not a JPEG/PNG or has no usable capture time; an
/// unrecognized capture time encoding is returned as an error.
pub fn recommended_filename(
    path: &Path,
    options: &NamingOptions,
) -> Result<Option<PathBuf>, MetadataError> {
    if normalized_extension(path).is_none() {
        return Ok(None);
    }

    Ok(extract_capture_time(path)?
        .and_then(|capture_time| canonical_path(path, &capture_time, options)))
}
