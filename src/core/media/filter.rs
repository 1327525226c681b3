//! Decides which walked files the cataloger looks at.

use super::MediaKind;
use std::path::Path;

/// Filters walked files down to catalogable media
#[derive(Debug, Clone)]
pub struct MediaFilter {
    include_video: bool,
    include_hidden: bool,
}

impl MediaFilter {
    /// Images only, hidden files skipped
    pub fn new() -> Self {
        Self {
            include_video: false,
            include_hidden: false,
        }
    }

    pub fn with_video(mut self, include: bool) -> Self {
        self.include_video = include;
        self
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Kind of the file if it should be cataloged
    pub fn accept(&self, path: &Path) -> Option<MediaKind> {
        if !self.include_hidden && is_hidden(path) {
            return None;
        }

        match MediaKind::from_path(path) {
            MediaKind::Image => Some(MediaKind::Image),
            MediaKind::Video if self.include_video => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Whether a directory should be descended into
    pub fn should_descend(&self, dir: &Path) -> bool {
        self.include_hidden || !is_hidden(dir)
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
