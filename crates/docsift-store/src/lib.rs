//! docsift store — SQLite-backed lifecycle records for ingested documents.

pub mod metadata;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use metadata::MetadataStore;
pub use sqlite::SqliteStore;
pub use types::*;
