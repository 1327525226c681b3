//! The catalog walk.

use super::scan::{backfill, scan_new};
use super::{CatalogConfig, CatalogReport};
use crate::core::index::{FileIndex, FileRecord};
use crate::core::media::{MediaFilter, MediaKind};
use crate::error::{CatalogError, FileError, IndexError};
use crate::events::{null_sender, CatalogEvent, EventSender};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};
use walkdir::WalkDir;

/// Catalogs a directory tree into a [`FileIndex`]
pub struct Cataloger<'a> {
    index: &'a dyn FileIndex,
    config: CatalogConfig,
    filter: MediaFilter,
}

impl<'a> Cataloger<'a> {
    pub fn new(index: &'a dyn FileIndex, config: CatalogConfig) -> Self {
        let filter = MediaFilter::new()
            .with_video(config.include_video)
            .with_hidden(config.include_hidden);

        Self {
            index,
            config,
            filter,
        }
    }

    /// Catalog `root` without event reporting
    pub fn run(&self, root: &Path) -> Result<CatalogReport, CatalogError> {
        self.run_with_events(root, &null_sender())
    }

    /// Catalog `root`, reporting progress on `events`
    pub fn run_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<CatalogReport, CatalogError> {
        if !root.is_dir() {
            return Err(CatalogError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let start_time = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("catalog", run_id = %run_id);
        let _guard = span.enter();

        info!(root = %root.display(), "Catalog run started");
        events.catalog(CatalogEvent::Started {
            run_id: run_id.clone(),
            root: root.to_path_buf(),
        });

        let mut run = Run {
            index: self.index,
            events,
            batch_size: self.config.batch_size.max(1),
            pending: Vec::new(),
            report: CatalogReport {
                run_id,
                ..CatalogReport::default()
            },
        };

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || self.filter.should_descend(entry.path())
            });

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    match self.media_files(entry.path()) {
                        Ok(files) => self.catalog_directory(entry.path(), files, &mut run)?,
                        Err(source) if entry.depth() == 0 => {
                            return Err(CatalogError::Walk {
                                path: root.to_path_buf(),
                                source,
                            })
                        }
                        Err(e) => run.skip(FileError::Walk {
                            path: entry.path().to_path_buf(),
                            reason: e.to_string(),
                        }),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    run.skip(FileError::Walk {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        run.flush()?;

        let mut report = run.report;
        report.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            files_seen = report.files_seen,
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "Catalog run finished"
        );
        events.catalog(CatalogEvent::Completed {
            summary: report.summary(),
        });

        Ok(report)
    }

    /// Accepted media files directly inside `dir`, sorted by path
    fn media_files(&self, dir: &Path) -> std::io::Result<Vec<(PathBuf, MediaKind)>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            let file_type = entry.file_type()?;
            let is_file = if file_type.is_symlink() {
                self.config.follow_symlinks
                    && fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false)
            } else {
                file_type.is_file()
            };

            if !is_file {
                continue;
            }

            if let Some(kind) = self.filter.accept(&path) {
                files.push((path, kind));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    fn catalog_directory(
        &self,
        dir: &Path,
        files: Vec<(PathBuf, MediaKind)>,
        run: &mut Run<'_>,
    ) -> Result<(), IndexError> {
        if files.is_empty() {
            return Ok(());
        }

        info!(path = %dir.display(), files = files.len(), "Cataloging directory");
        run.events.catalog(CatalogEvent::DirectoryEntered {
            path: dir.to_path_buf(),
            files: files.len(),
        });
        run.report.files_seen += files.len();

        let mut unseen = Vec::new();
        let mut seen = Vec::new();
        for (path, kind) in files {
            match self.index.get(&path)? {
                Some(existing) => seen.push((existing, kind)),
                None => unseen.push((path, kind)),
            }
        }

        let scanned: Vec<Result<FileRecord, FileError>> = if self.config.parallel {
            unseen
                .par_iter()
                .map(|(path, kind)| scan_new(path, *kind))
                .collect()
        } else {
            unseen
                .iter()
                .map(|(path, kind)| scan_new(path, *kind))
                .collect()
        };

        for result in scanned {
            match result {
                Ok(record) => {
                    debug!(path = %record.path.display(), fingerprint = %record.fingerprint, "New file");
                    run.report.added += 1;
                    run.events.catalog(CatalogEvent::FileAdded {
                        path: record.path.clone(),
                    });
                    run.stage(record)?;
                }
                Err(e) => run.skip(e),
            }
        }

        for (existing, kind) in seen {
            match backfill(&existing, kind) {
                Ok(Some(record)) => {
                    debug!(path = %record.path.display(), "Backfilled record");
                    run.report.updated += 1;
                    run.events.catalog(CatalogEvent::FileUpdated {
                        path: record.path.clone(),
                    });
                    run.stage(record)?;
                }
                Ok(None) => run.report.unchanged += 1,
                Err(e) => run.skip(e),
            }
        }

        run.flush()
    }
}

/// Mutable state of one catalog run
struct Run<'a> {
    index: &'a dyn FileIndex,
    events: &'a EventSender,
    batch_size: usize,
    pending: Vec<FileRecord>,
    report: CatalogReport,
}

impl Run<'_> {
    fn stage(&mut self, record: FileRecord) -> Result<(), IndexError> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IndexError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        self.index.upsert_batch(&self.pending)?;

        let records = self.pending.len();
        self.pending.clear();
        self.report.batches_committed += 1;

        info!(records, "Committed catalog batch");
        self.events.catalog(CatalogEvent::Committed { records });
        Ok(())
    }

    fn skip(&mut self, error: FileError) {
        warn!(path = %error.path().display(), error = %error, "Skipping file");
        self.events.catalog(CatalogEvent::Error {
            path: error.path().to_path_buf(),
            message: error.to_string(),
        });
        self.report.skipped += 1;
        self.report.errors.push(error);
    }
}
