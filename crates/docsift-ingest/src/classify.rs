//! Paragraph-count length classification.

use docsift_core::{LengthCategory, LengthThresholds};

/// Maps extracted text to a length category. Pure, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    thresholds: LengthThresholds,
}

impl Classifier {
    pub fn new(thresholds: LengthThresholds) -> Self {
        Self { thresholds }
    }

    /// Split on blank-line boundaries and bucket by paragraph count.
    ///
    /// Thresholds are inclusive upper bounds, so a count equal to `short`
    /// is Short and a count equal to `medium` is Medium.
    pub fn classify<'a>(&self, text: &'a str) -> (LengthCategory, Vec<&'a str>) {
        let paragraphs = split_paragraphs(text);
        (self.category_for(paragraphs.len()), paragraphs)
    }

    pub fn category_for(&self, paragraphs: usize) -> LengthCategory {
        if paragraphs <= self.thresholds.short {
            LengthCategory::Short
        } else if paragraphs <= self.thresholds.medium {
            LengthCategory::Medium
        } else {
            LengthCategory::Long
        }
    }
}

/// Paragraph units separated by `"\n\n"`.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(n: usize) -> String {
        (0..n)
            .map(|i| format!("Paragraph {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_boundaries_go_to_lower_category() {
        let c = Classifier::default();
        assert_eq!(c.classify(&paragraphs(1)).0, LengthCategory::Short);
        assert_eq!(c.classify(&paragraphs(10)).0, LengthCategory::Short);
        assert_eq!(c.classify(&paragraphs(11)).0, LengthCategory::Medium);
        assert_eq!(c.classify(&paragraphs(50)).0, LengthCategory::Medium);
        assert_eq!(c.classify(&paragraphs(51)).0, LengthCategory::Long);
    }

    #[test]
    fn test_returns_paragraph_list() {
        let c = Classifier::default();
        let (_, pages) = c.classify("one\n\ntwo\nstill two\n\nthree");
        assert_eq!(pages, vec!["one", "two\nstill two", "three"]);
    }

    #[test]
    fn test_custom_thresholds() {
        let c = Classifier::new(LengthThresholds { short: 1, medium: 2 });
        assert_eq!(c.classify("a").0, LengthCategory::Short);
        assert_eq!(c.classify("a\n\nb").0, LengthCategory::Medium);
        assert_eq!(c.classify("a\n\nb\n\nc").0, LengthCategory::Long);
    }

    #[test]
    fn test_deterministic() {
        let c = Classifier::default();
        let text = paragraphs(30);
        assert_eq!(c.classify(&text), c.classify(&text));
    }
}
