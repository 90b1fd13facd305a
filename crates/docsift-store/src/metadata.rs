//! The two-phase lifecycle contract between the pipeline and a store.
//!
//! Implementations must be safe to share across workers. Neither call
//! retries; retry policy belongs to the caller.

use docsift_core::{Result, WorkItem};

use crate::types::{CommitStatus, CommitUpdate};

/// Stage/commit operations on a document's lifecycle record.
pub trait MetadataStore: Send + Sync {
    /// Insert a staged record (id, size, ingestion timestamp).
    /// Returns the new record's row id.
    fn stage_initial(&self, item: &WorkItem, size: u64) -> Result<i64>;

    /// Fill in summary, keywords and timing on the staged record for `id`.
    ///
    /// Zero matches is `Ok(CommitStatus::NoMatch)`, not an error.
    fn commit_processed(&self, id: &str, update: &CommitUpdate) -> Result<CommitStatus>;
}
