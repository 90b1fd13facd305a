//! Docsift Ingest — text sources, length classification and enrichment.

pub mod classify;
pub mod enrich;
pub mod file;
pub mod ocr;
pub mod pdf;
pub mod remote;
pub mod source;

pub use classify::Classifier;
pub use enrich::{Enricher, HeuristicEnricher};
pub use ocr::{NoOcr, OcrBackend, TesseractCli};
pub use source::{DocumentSource, ExtractedText, ExtractionMethod, TextSource};
