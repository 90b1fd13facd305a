//! PDF text-layer extraction via `pdf-extract`.

use docsift_core::{Error, Result};

/// PDF magic number.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Extract the embedded text layer of a PDF held in memory.
///
/// `pdf-extract` panics on some malformed inputs; that is reported as a
/// malformed document rather than unwinding into the caller.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    if !is_pdf(bytes) {
        return Err(Error::Extraction("malformed document: missing %PDF header".into()));
    }

    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::Extraction(format!("malformed document: {}", e))),
        Err(_) => Err(Error::Extraction(
            "malformed document: PDF parser aborted".into(),
        )),
    }
}
