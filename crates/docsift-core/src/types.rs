//! Work items, per-item outcomes and batch results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a work item's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A path on the local filesystem.
    File,
    /// An `http`/`https` URL.
    Url,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of input submitted for ingestion. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// File path or URL; also the key of the stored record.
    pub id: String,
    pub kind: SourceKind,
    /// For URLs: download to local storage first instead of extracting in memory.
    pub download: bool,
}

impl WorkItem {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            id: path.into(),
            kind: SourceKind::File,
            download: false,
        }
    }

    pub fn url(url: impl Into<String>, download: bool) -> Self {
        Self {
            id: url.into(),
            kind: SourceKind::Url,
            download,
        }
    }
}

/// Coarse length bucket derived from paragraph count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthCategory {
    Short,
    Medium,
    Long,
}

impl LengthCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(Self::Short),
            "medium" => Some(Self::Medium),
            "long" => Some(Self::Long),
            _ => None,
        }
    }
}

impl fmt::Display for LengthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason code attached to a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Malformed path, URL or manifest entry. Never dispatched to a worker.
    InvalidInput,
    /// IO, parse, network or OCR backend error.
    ExtractionFailed,
    /// The enrichment stage could not run at all.
    EnrichmentFailed,
    /// Connectivity or serialization error on stage or commit.
    StoreFailed,
    /// The worker task panicked while holding the item.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "InvalidInput",
            Self::ExtractionFailed => "ExtractionFailed",
            Self::EnrichmentFailed => "EnrichmentFailed",
            Self::StoreFailed => "StoreFailed",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged per-item failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, reason)
    }

    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::ExtractionFailed, reason)
    }

    pub fn enrichment(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::EnrichmentFailed, reason)
    }

    pub fn store(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::StoreFailed, reason)
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// What a successfully processed item produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub category: LengthCategory,
    pub paragraphs: usize,
    pub byte_size: u64,
    pub elapsed_seconds: f64,
    /// Summary or keywords fell back to empty because the enricher errored.
    pub degraded: bool,
    /// False when the commit update found no staged record to update.
    pub commit_matched: bool,
}

pub type ItemOutcome = std::result::Result<ItemReport, ItemFailure>;

/// Aggregated outcome of one batch. Immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub batch_id: String,
    pub success_count: usize,
    pub failure_count: usize,
    /// Items handed to the worker pool (excludes inputs rejected during expansion).
    pub dispatched: usize,
    pub errors: BTreeMap<String, ItemFailure>,
    pub categories: BTreeMap<LengthCategory, usize>,
    pub elapsed_ms: u64,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_constructors() {
        let f = WorkItem::file("/tmp/a.pdf");
        assert_eq!(f.kind, SourceKind::File);
        assert!(!f.download);

        let u = WorkItem::url("https://example.com/a.pdf", true);
        assert_eq!(u.kind, SourceKind::Url);
        assert!(u.download);
    }

    #[test]
    fn test_category_roundtrip_names() {
        for c in [LengthCategory::Short, LengthCategory::Medium, LengthCategory::Long] {
            assert_eq!(LengthCategory::parse(c.as_str()), Some(c));
        }
        assert_eq!(LengthCategory::parse("huge"), None);
    }

    #[test]
    fn test_failure_display() {
        let f = ItemFailure::extraction("unreadable file");
        assert_eq!(f.to_string(), "ExtractionFailed: unreadable file");
    }

    #[test]
    fn test_batch_result_json_shape() {
        let mut result = BatchResult {
            success_count: 1,
            failure_count: 1,
            ..Default::default()
        };
        result
            .errors
            .insert("a.pdf".into(), ItemFailure::invalid_input("missing"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["successCount"], 1);
        assert_eq!(json["errors"]["a.pdf"]["kind"], "InvalidInput");
        assert_eq!(result.total(), 2);
        assert!(!result.is_clean());
    }
}
