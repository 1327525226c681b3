//! SQLite backend for the catalog index.

use super::{FileIndex, FileRecord, IndexStats};
use crate::core::media::MediaKind;
use crate::core::metadata::{format_capture_time, parse_stored_capture_time};
use crate::error::IndexError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const RECORD_COLUMNS: &str = "name, size, sha256, filetype, datestamp";

/// SQLite-backed catalog index
///
/// A single connection behind a mutex; the index has one writer. WAL
/// journaling keeps readers in other processes unblocked.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteIndex {
    /// Open or create an index database at the given path
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| IndexError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::init(conn, path.to_path_buf())
    }

    /// A private, non-persistent index
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory().map_err(|e| IndexError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;

        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self, IndexError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS file (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                size INTEGER NOT NULL,
                sha256 TEXT NOT NULL,
                filetype TEXT,
                datestamp TEXT
            )",
            [],
        )?;

        // Catalogs created before kinds and capture times were tracked
        // lack these columns; the cataloger backfills them on the next run.
        Self::ensure_column(&conn, "filetype")?;
        Self::ensure_column(&conn, "datestamp")?;

        conn.execute("CREATE INDEX IF NOT EXISTS idx_file_sha256 ON file(sha256)", [])?;

        debug!(path = %db_path.display(), "Opened catalog index");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    fn ensure_column(conn: &Connection, column: &str) -> Result<(), IndexError> {
        let mut stmt = conn.prepare("PRAGMA table_info(file)")?;
        let exists = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(|r| r.ok())
            .any(|name| name == column);
        drop(stmt);

        if !exists {
            info!(column, "Adding missing column to catalog index");
            conn.execute(&format!("ALTER TABLE file ADD COLUMN {} TEXT", column), [])?;
        }
        Ok(())
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn.lock().map_err(|_| IndexError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn path_key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
        let name: String = row.get(0)?;
        let size: i64 = row.get(1)?;
        let kind: Option<String> = row.get(3)?;
        let datestamp: Option<String> = row.get(4)?;

        Ok(FileRecord {
            path: PathBuf::from(name),
            size: size.max(0) as u64,
            fingerprint: row.get(2)?,
            kind: kind.as_deref().and_then(MediaKind::parse),
            capture_time: datestamp.as_deref().and_then(parse_stored_capture_time),
        })
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<FileRecord>, IndexError> {
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl FileIndex for SqliteIndex {
    fn get(&self, path: &Path) -> Result<Option<FileRecord>, IndexError> {
        let conn = self.lock()?;

        let record = conn
            .query_row(
                &format!("SELECT {} FROM file WHERE name = ?", RECORD_COLUMNS),
                [Self::path_key(path)],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    fn upsert_batch(&self, records: &[FileRecord]) -> Result<(), IndexError> {
        for record in records {
            record.validate()?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO file (name, size, sha256, filetype, datestamp)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(name) DO UPDATE SET
                    size = excluded.size,
                    sha256 = excluded.sha256,
                    filetype = excluded.filetype,
                    datestamp = excluded.datestamp",
            )?;

            for record in records {
                stmt.execute(params![
                    Self::path_key(&record.path),
                    record.size as i64,
                    record.fingerprint,
                    record.kind.map(|k| k.as_str()),
                    record.capture_time.as_ref().map(format_capture_time),
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn delete_batch(&self, paths: &[PathBuf]) -> Result<usize, IndexError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM file WHERE name = ?")?;
            for path in paths {
                deleted += stmt.execute([Self::path_key(path)])?;
            }
        }
        tx.commit()?;

        Ok(deleted)
    }

    fn relocate(&self, from: &Path, to: &Path) -> Result<bool, IndexError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM file WHERE name = ?)",
            [Self::path_key(from)],
            |row| row.get(0),
        )?;

        if !exists {
            return Ok(false);
        }

        if from != to {
            tx.execute("DELETE FROM file WHERE name = ?", [Self::path_key(to)])?;
            tx.execute(
                "UPDATE file SET name = ? WHERE name = ?",
                params![Self::path_key(to), Self::path_key(from)],
            )?;
        }
        tx.commit()?;

        Ok(true)
    }

    fn duplicate_fingerprints(&self) -> Result<Vec<String>, IndexError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT sha256 FROM file GROUP BY sha256 HAVING COUNT(*) > 1 ORDER BY sha256",
        )?;
        let fingerprints = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(fingerprints)
    }

    fn records_with_fingerprint(&self, fingerprint: &str) -> Result<Vec<FileRecord>, IndexError> {
        let conn = self.lock()?;
        Self::query_records(
            &conn,
            &format!(
                "SELECT {} FROM file WHERE sha256 = ? ORDER BY name",
                RECORD_COLUMNS
            ),
            [fingerprint],
        )
    }

    fn duplicate_records(&self) -> Result<Vec<FileRecord>, IndexError> {
        let conn = self.lock()?;
        Self::query_records(
            &conn,
            &format!(
                "SELECT {} FROM file
                 WHERE sha256 IN (SELECT sha256 FROM file GROUP BY sha256 HAVING COUNT(*) > 1)
                 ORDER BY sha256, name",
                RECORD_COLUMNS
            ),
            [],
        )
    }

    fn paths(&self) -> Result<Vec<PathBuf>, IndexError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT name FROM file ORDER BY name")?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(PathBuf::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(paths)
    }

    fn stats(&self) -> Result<IndexStats, IndexError> {
        let conn = self.lock()?;

        let (total_records, total_bytes, distinct_fingerprints) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0), COUNT(DISTINCT sha256) FROM file",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let (duplicate_sets, redundant_records, reclaimable_bytes) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(qty - 1), 0), COALESCE(SUM((qty - 1) * size), 0)
             FROM (SELECT COUNT(*) AS qty, MAX(size) AS size
                   FROM file GROUP BY sha256 HAVING COUNT(*) > 1)",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        Ok(IndexStats {
            total_records: total_records as usize,
            total_bytes: total_bytes as u64,
            distinct_fingerprints: distinct_fingerprints as usize,
            duplicate_sets: duplicate_sets as usize,
            redundant_records: redundant_records as usize,
            reclaimable_bytes: reclaimable_bytes as u64,
        })
    }
}
