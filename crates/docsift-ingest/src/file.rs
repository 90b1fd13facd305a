//! Local file text extraction for the supported formats.

use std::path::Path;

use docsift_core::{Error, Result};
use tracing::{debug, info};

use crate::ocr::OcrBackend;
use crate::pdf;
use crate::source::{ExtractedText, ExtractionMethod};

/// Supported file types for text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    PlainText,
    Markdown,
    Code,
    Json,
    Pdf,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Self::PlainText,
            "md" | "mdx" => Self::Markdown,
            "py" | "js" | "ts" | "rs" | "go" | "java" | "c" | "h" | "cpp" | "sh" | "yaml"
            | "yml" | "toml" | "ini" | "cfg" | "xml" | "html" | "htm" | "css" | "sql" | "csv" => {
                Self::Code
            }
            "json" => Self::Json,
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a text-based file type.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Self::PlainText | Self::Markdown | Self::Code | Self::Json
        )
    }
}

/// Read and extract a local file. PDFs with a blank text layer go through OCR.
pub fn extract_file(path: &Path, ocr: &dyn OcrBackend) -> Result<ExtractedText> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Extraction(format!("unreadable file {}: {}", path.display(), e)))?;
    let byte_size = bytes.len() as u64;

    let file_type = match FileType::from_path(path) {
        FileType::Unknown if pdf::is_pdf(&bytes) => FileType::Pdf,
        other => other,
    };

    if file_type == FileType::Pdf {
        let text = pdf::extract_pdf_text(&bytes)?;
        if !text.trim().is_empty() {
            return Ok(ExtractedText {
                text,
                byte_size,
                method: ExtractionMethod::PdfText,
            });
        }

        info!(
            "No text layer in {}, falling back to OCR ({})",
            path.display(),
            ocr.name()
        );
        let pages = ocr.ocr_pdf(path)?;
        debug!("OCR produced {} pages for {}", pages.len(), path.display());
        return Ok(ExtractedText {
            text: pages.join("\n\n"),
            byte_size,
            method: ExtractionMethod::Ocr,
        });
    }

    let text = decode_text(bytes, file_type, path)?;
    Ok(ExtractedText {
        text,
        byte_size,
        method: ExtractionMethod::PlainText,
    })
}

/// Decode bytes as UTF-8 text, rejecting content that looks binary.
pub fn decode_text(bytes: Vec<u8>, file_type: FileType, path: &Path) -> Result<String> {
    let content = String::from_utf8(bytes).map_err(|e| {
        Error::Extraction(format!("{} is not valid UTF-8: {}", path.display(), e))
    })?;

    if !file_type.is_text() && looks_binary(&content) {
        return Err(Error::Extraction(format!(
            "{} looks like a binary file",
            path.display()
        )));
    }
    Ok(content)
}

fn looks_binary(content: &str) -> bool {
    content
        .chars()
        .filter(|c| c.is_control() && *c != '\n' && *c != '\r' && *c != '\t')
        .count()
        > content.len() / 10
}
