//! # Media Module
//!
//! Classifies paths as image, video or unknown from their file name.
//!
//! Classification never touches the filesystem: the extension is looked up
//! (case-insensitively) in a mimetype table and the top-level type decides
//! the kind. Files without an extension are `Unknown`.

mod filter;

pub use filter::MediaFilter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extension to mimetype table
const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("ico", "image/vnd.microsoft.icon"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("3gp", "video/3gpp"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("mts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
];

/// Kind of media a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl MediaKind {
    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Self {
        match mime_type(path) {
            Some(mime) if mime.starts_with("image/") => MediaKind::Image,
            Some(mime) if mime.starts_with("video/") => MediaKind::Video,
            _ => MediaKind::Unknown,
        }
    }

    /// Name used in the index `filetype` column
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Unknown => "unknown",
        }
    }

    /// Parse the index `filetype` column
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "unknown" => Some(MediaKind::Unknown),
            _ => None,
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess the mimetype of a path from its extension
pub fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Classify a path as image, video or unknown
pub fn classify(path: &Path) -> MediaKind {
    MediaKind::from_path(path)
}

pub fn is_image(path: &Path) -> bool {
    classify(path) == MediaKind::Image
}

pub fn is_video(path: &Path) -> bool {
    classify(path) == MediaKind::Video
}

/// Image or video
pub fn is_media(path: &Path) -> bool {
    classify(path).is_media()
}
