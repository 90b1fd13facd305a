//! Database schema SQL.

/// Lifecycle records: one row per ingestion attempt.
///
/// `source` holds the file path or URL. Rows are staged with
/// `processed_at` NULL and filled in by the commit update.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    size INTEGER NOT NULL,
    ingested_at TEXT NOT NULL,
    length_category TEXT,
    summary TEXT,
    keywords_json TEXT,
    processing_time_seconds REAL,
    processed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source);
CREATE INDEX IF NOT EXISTS idx_documents_pending ON documents(source, processed_at);
"#;
