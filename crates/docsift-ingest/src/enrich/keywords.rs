//! TF-IDF keyword ranking over unigrams and bigrams of a single document.
//!
//! With one document every term has the same inverse document frequency,
//! so the score reduces to the L2-normalised term count.

use std::collections::HashMap;

use docsift_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use super::stopwords::is_stop_word;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("static regex"));

/// Lowercased word tokens of two or more characters, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Score every unigram and bigram of `text`.
pub fn score_terms(text: &str) -> Vec<(String, f64)> {
    let tokens = tokenize(text);
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in &tokens {
        *counts.entry(token.clone()).or_default() += 1;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
    }

    let norm = counts
        .values()
        .map(|&c| (c * c) as f64)
        .sum::<f64>()
        .sqrt();
    if norm == 0.0 {
        return Vec::new();
    }

    let mut scored: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(term, count)| (term, count as f64 / norm))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored
}

/// Top `top_n` terms by descending score, ties broken alphabetically.
///
/// Blank input yields an empty list. `top_n == 0` is a caller error.
pub fn extract_keywords(text: &str, top_n: usize) -> Result<Vec<String>> {
    if top_n == 0 {
        return Err(Error::InvalidInput("top_n must be positive".into()));
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(score_terms(text)
        .into_iter()
        .take(top_n)
        .map(|(term, _)| term)
        .collect())
}
