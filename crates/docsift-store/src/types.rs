//! Data types for lifecycle records and store results.

use std::time::Duration;

use docsift_core::{LengthCategory, SourceKind};
use serde::{Deserialize, Serialize};

/// A document row from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: i64,
    /// File path or URL the record is keyed by.
    pub source: String,
    pub kind: SourceKind,
    pub size: u64,
    pub ingested_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_category: Option<LengthCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl DocumentRecord {
    /// Whether the commit update has landed on this record.
    pub fn is_committed(&self) -> bool {
        self.processed_at.is_some()
    }

    /// The document shape exchanged with other tools: keyed by
    /// `filePath` or `url` depending on the source kind, other field
    /// names matching the serde derive.
    pub fn to_wire(&self) -> serde_json::Value {
        let key = match self.kind {
            SourceKind::File => "filePath",
            SourceKind::Url => "url",
        };
        let mut map = serde_json::Map::new();
        map.insert(key.into(), self.source.clone().into());
        map.insert("size".into(), self.size.into());
        map.insert("ingestedAt".into(), self.ingested_at.clone().into());
        if let Some(c) = self.length_category {
            map.insert("lengthCategory".into(), c.as_str().into());
        }
        if let Some(s) = &self.summary {
            map.insert("summary".into(), s.clone().into());
        }
        if let Some(k) = &self.keywords {
            map.insert("keywords".into(), k.clone().into());
        }
        if let Some(t) = self.processing_time_seconds {
            map.insert("processingTimeSeconds".into(), t.into());
        }
        if let Some(p) = &self.processed_at {
            map.insert("processedAt".into(), p.clone().into());
        }
        serde_json::Value::Object(map)
    }
}

/// Fields written by the commit update.
#[derive(Debug, Clone, Default)]
pub struct CommitUpdate {
    pub summary: String,
    pub keywords: Vec<String>,
    pub elapsed: Duration,
    pub length_category: Option<LengthCategory>,
    /// Final byte size, for sources whose size was unknown at stage time.
    pub size: Option<u64>,
}

/// Result of a commit that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// The staged record was updated.
    Updated,
    /// No staged record matched; nothing was written.
    NoMatch,
}

impl CommitStatus {
    pub fn matched_count(&self) -> usize {
        match self {
            Self::Updated => 1,
            Self::NoMatch => 0,
        }
    }
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_documents: i64,
    pub committed_documents: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
