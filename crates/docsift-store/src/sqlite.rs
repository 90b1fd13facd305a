//! SQLite document store.
//!
//! One connection behind a mutex; WAL mode so readers opening the same
//! file from another process are not blocked by ingestion.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::metadata::MetadataStore;
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use docsift_core::{Error, LengthCategory, Result, SourceKind, WorkItem};

/// SQLite-backed lifecycle store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/docsift.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("docsift.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let doc_count = store.count_documents()?;
        info!(
            "SqliteStore initialized: {} documents, path={}",
            doc_count,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------------------------------------------------------
    // Lifecycle writes
    // ---------------------------------------------------------------

    /// Insert a staged record. Returns the new row id.
    pub fn stage(&self, source: &str, kind: SourceKind, size: u64) -> Result<i64> {
        let now = now_rfc3339();
        let size = i64::try_from(size)
            .map_err(|_| Error::Storage(format!("size out of range: {}", size)))?;

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO documents (source, source_kind, size, ingested_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![source, kind.as_str(), size, now])
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Staged record {} for {}", id, source);
        Ok(id)
    }

    /// Update the newest uncommitted record for `source`.
    ///
    /// Records are matched by source, not by the row id `stage` returned.
    /// When one source is in flight twice, an attempt may commit onto the
    /// other attempt's newer row; if that other attempt then fails, the
    /// older row is left staged and reads as the failed one. Counts per
    /// source stay right, attribution between the two attempts does not.
    pub fn commit(&self, source: &str, update: &CommitUpdate) -> Result<CommitStatus> {
        let keywords_json = serde_json::to_string(&update.keywords)?;
        let category = update.length_category.map(|c| c.as_str());
        let size = update
            .size
            .map(|s| i64::try_from(s).map_err(|_| Error::Storage(format!("size out of range: {}", s))))
            .transpose()?;
        let now = now_rfc3339();

        let conn = self.conn.lock();
        let count = conn
            .prepare_cached(
                "UPDATE documents SET summary = ?1, keywords_json = ?2, \
                 processing_time_seconds = ?3, processed_at = ?4, \
                 length_category = COALESCE(?5, length_category), \
                 size = COALESCE(?6, size) \
                 WHERE id = ( \
                     SELECT id FROM documents \
                     WHERE source = ?7 AND processed_at IS NULL \
                     ORDER BY id DESC LIMIT 1 \
                 )",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![
                update.summary,
                keywords_json,
                update.elapsed.as_secs_f64(),
                now,
                category,
                size,
                source,
            ])
            .map_err(|e| Error::Database(e.to_string()))?;

        if count > 0 {
            debug!("Committed record for {}", source);
            Ok(CommitStatus::Updated)
        } else {
            Ok(CommitStatus::NoMatch)
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Get a record by row id.
    pub fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM documents WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], |row| Ok(Self::row_to_record(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Most recent record (staged or committed) for a path or URL.
    pub fn latest_for_source(&self, source: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM documents WHERE source = ?1 ORDER BY id DESC LIMIT 1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![source], |row| Ok(Self::row_to_record(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Every attempt recorded for a path or URL, oldest first.
    pub fn records_for_source(&self, source: &str) -> Result<Vec<DocumentRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT * FROM documents WHERE source = ?1 ORDER BY id ASC")
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![source], |row| Ok(Self::row_to_record(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Get all records.
    pub fn get_all_documents(&self, ascending: bool) -> Result<Vec<DocumentRecord>> {
        let order = if ascending { "ASC" } else { "DESC" };
        let conn = self.conn.lock();
        let sql = format!("SELECT * FROM documents ORDER BY id {}", order);
        let mut stmt = conn.prepare(&sql).map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_record(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Count total records.
    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    pub fn get_stats(&self) -> Result<StoreStats> {
        let total_documents = self.count_documents()?;
        let committed_documents: i64 = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE processed_at IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?
        };
        let db_size_mb = std::fs::metadata(&self.db_path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        Ok(StoreStats {
            total_documents,
            committed_documents,
            db_path: self.db_path.display().to_string(),
            db_size_mb,
        })
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_record(row: &rusqlite::Row<'_>) -> DocumentRecord {
        DocumentRecord {
            id: row.get("id").unwrap_or(0),
            source: row.get("source").unwrap_or_default(),
            kind: row
                .get::<_, String>("source_kind")
                .ok()
                .and_then(|k| SourceKind::parse(&k))
                .unwrap_or(SourceKind::File),
            size: row.get::<_, i64>("size").map(|s| s.max(0) as u64).unwrap_or(0),
            ingested_at: row.get("ingested_at").unwrap_or_default(),
            length_category: row
                .get::<_, Option<String>>("length_category")
                .ok()
                .flatten()
                .and_then(|c| LengthCategory::parse(&c)),
            summary: row.get("summary").ok().flatten(),
            keywords: row
                .get::<_, Option<String>>("keywords_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            processing_time_seconds: row.get("processing_time_seconds").ok().flatten(),
            processed_at: row.get("processed_at").ok().flatten(),
        }
    }
}

impl MetadataStore for SqliteStore {
    fn stage_initial(&self, item: &WorkItem, size: u64) -> Result<i64> {
        self.stage(&item.id, item.kind, size)
    }

    fn commit_processed(&self, id: &str, update: &CommitUpdate) -> Result<CommitStatus> {
        self.commit(id, update)
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
