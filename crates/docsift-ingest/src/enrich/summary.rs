//! Extractive summaries.
//!
//! Input is cut to a token budget, the budget picks a length band, and the
//! highest scoring sentences are packed into that band in document order.

use docsift_core::{EnrichmentConfig, SummaryBand};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("static regex"));

const KEY_WORDS: &[&str] = &[
    "important", "key", "main", "conclusion", "summary", "result", "finding",
    "therefore", "thus", "shows", "demonstrates", "reveals", "significant", "notably",
];

/// How a text will be summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPlan {
    pub input_tokens: usize,
    /// Tokens left after truncation.
    pub tokens: usize,
    /// Byte length of the truncated input.
    pub cut: usize,
    pub band: SummaryBand,
}

impl SummaryPlan {
    pub fn truncated(&self) -> bool {
        self.tokens < self.input_tokens
    }
}

/// Work out truncation and band without summarizing.
pub fn plan(text: &str, max_input_tokens: usize, config: &EnrichmentConfig) -> SummaryPlan {
    let mut input_tokens = 0;
    let mut cut = 0;
    for m in TOKEN_RE.find_iter(text) {
        input_tokens += 1;
        if input_tokens <= max_input_tokens {
            cut = m.end();
        }
    }
    let tokens = input_tokens.min(max_input_tokens);
    SummaryPlan {
        input_tokens,
        tokens,
        cut,
        band: config.band_for(tokens),
    }
}

/// Summarize `text`. Blank input gives an empty summary.
pub fn summarize(text: &str, max_input_tokens: usize, config: &EnrichmentConfig) -> String {
    let plan = plan(text, max_input_tokens, config);
    if plan.tokens == 0 {
        return String::new();
    }
    let input = &text[..plan.cut];
    let sentences = split_sentences(input);
    select(&sentences, plan.band).join(" ")
}

/// Split on `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'.' || b == b'!' || b == b'?')
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_whitespace()
        {
            let s = text[start..=i].trim();
            if !s.is_empty() {
                sentences.push(s);
            }
            start = i + 1;
        }
    }
    let s = text[start..].trim();
    if !s.is_empty() {
        sentences.push(s);
    }
    sentences
}

fn score(sentence: &str, index: usize, total: usize) -> i32 {
    let mut score = 0i32;

    if index < 3 {
        score += (3 - index) as i32;
    }
    if total > 5 && index >= total.saturating_sub(2) {
        score += 2;
    }

    let len = sentence.len();
    if len > 50 && len < 200 {
        score += 2;
    } else if len >= 200 {
        score += 1;
    }

    let lower = sentence.to_lowercase();
    let hits = KEY_WORDS.iter().filter(|kw| lower.contains(**kw)).count();
    score += (hits * 2) as i32;

    let capitalized = sentence
        .split_whitespace()
        .skip(1)
        .filter(|w| {
            w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
                && !w.chars().all(|c| c.is_uppercase())
        })
        .count();
    score += capitalized.min(3) as i32;

    score
}

/// Greedily take the best sentences until `min_length` words are reached
/// without going over `max_length`.
fn select(sentences: &[&str], band: SummaryBand) -> Vec<String> {
    let total = sentences.len();
    let mut ranked: Vec<(i32, usize)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (score(s, i, total), i))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut chosen: Vec<usize> = Vec::new();
    let mut words = 0;
    for &(_, i) in &ranked {
        let len = sentences[i].split_whitespace().count();
        if words + len <= band.max_length {
            chosen.push(i);
            words += len;
        }
        if words >= band.min_length {
            break;
        }
    }

    if chosen.is_empty() {
        let Some(&(_, best)) = ranked.first() else {
            return Vec::new();
        };
        let clipped: Vec<&str> = sentences[best]
            .split_whitespace()
            .take(band.max_length)
            .collect();
        return vec![clipped.join(" ")];
    }

    chosen.sort_unstable();
    chosen.into_iter().map(|i| sentences[i].to_string()).collect()
}
