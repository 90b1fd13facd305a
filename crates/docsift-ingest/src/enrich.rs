//! Summaries and keywords.
//!
//! Both are pure functions of the text. The `Enricher` trait is the seam a
//! model-backed implementation would plug into.

pub mod keywords;
pub mod stopwords;
pub mod summary;

use docsift_core::{EnrichmentConfig, Result};

pub use keywords::extract_keywords;
pub use summary::{plan, summarize, SummaryPlan};

/// Summary and keyword backend. Called from blocking worker threads.
pub trait Enricher: Send + Sync {
    fn summarize(&self, text: &str, max_input_tokens: usize) -> Result<String>;

    /// Fails with `Error::InvalidInput` when `top_n` is zero.
    fn extract_keywords(&self, text: &str, top_n: usize) -> Result<Vec<String>>;
}

/// Extractive summaries and TF-IDF keywords, no model required.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEnricher {
    config: EnrichmentConfig,
}

impl HeuristicEnricher {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self { config }
    }
}

impl Enricher for HeuristicEnricher {
    fn summarize(&self, text: &str, max_input_tokens: usize) -> Result<String> {
        Ok(summarize(text, max_input_tokens, &self.config))
    }

    fn extract_keywords(&self, text: &str, top_n: usize) -> Result<Vec<String>> {
        extract_keywords(text, top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_enricher() {
        let enricher = HeuristicEnricher::default();
        let text = "Rust ownership rules prevent data races. \
                    Ownership and borrowing are checked at compile time.";
        let summary = enricher.summarize(text, 1024).unwrap();
        assert!(!summary.is_empty());

        let keywords = enricher.extract_keywords(text, 3).unwrap();
        assert_eq!(keywords[0], "ownership");
        assert!(enricher.extract_keywords(text, 0).is_err());
    }
}
