//! Text sources: local files, remote URLs, OCR fallback.
//!
//! Everything a backend can throw is turned into an `Error` here; nothing
//! unwinds past `TextSource::fetch`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docsift_core::{Error, Result, SourceKind, WorkItem};
use reqwest::Client;
use serde::Serialize;

use crate::file::{self, FileType};
use crate::ocr::OcrBackend;
use crate::{pdf, remote};

/// How the text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PlainText,
    PdfText,
    Ocr,
}

/// Raw text of one item. Owned by the worker processing that item.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub byte_size: u64,
    pub method: ExtractionMethod,
}

/// "Get the text for an item."
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Byte size known before extraction, if any.
    async fn size_hint(&self, item: &WorkItem) -> Option<u64>;

    async fn fetch(&self, item: &WorkItem) -> Result<ExtractedText>;
}

/// Default source: filesystem, HTTP and an OCR fallback for scanned PDFs.
pub struct DocumentSource {
    client: Client,
    ocr: Arc<dyn OcrBackend>,
    download_dir: PathBuf,
}

impl DocumentSource {
    pub fn new(
        download_dir: impl Into<PathBuf>,
        ocr: Arc<dyn OcrBackend>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            ocr,
            download_dir: download_dir.into(),
        })
    }

    async fn fetch_local(&self, path: PathBuf) -> Result<ExtractedText> {
        let ocr = self.ocr.clone();
        tokio::task::spawn_blocking(move || file::extract_file(&path, ocr.as_ref()))
            .await
            .map_err(|e| Error::Extraction(format!("extraction task failed: {}", e)))?
    }

    async fn fetch_remote(&self, url: &str, download: bool) -> Result<ExtractedText> {
        if download {
            let path = remote::download(&self.client, url, &self.download_dir).await?;
            return self.fetch_local(path).await;
        }

        let bytes = remote::fetch_bytes(&self.client, url).await?;
        let label = url.to_string();
        tokio::task::spawn_blocking(move || extract_in_memory(bytes, &label))
            .await
            .map_err(|e| Error::Extraction(format!("extraction task failed: {}", e)))?
    }
}

#[async_trait]
impl TextSource for DocumentSource {
    async fn size_hint(&self, item: &WorkItem) -> Option<u64> {
        match item.kind {
            SourceKind::File => tokio::fs::metadata(&item.id).await.ok().map(|m| m.len()),
            SourceKind::Url => None,
        }
    }

    async fn fetch(&self, item: &WorkItem) -> Result<ExtractedText> {
        match item.kind {
            SourceKind::File => self.fetch_local(PathBuf::from(&item.id)).await,
            SourceKind::Url => self.fetch_remote(&item.id, item.download).await,
        }
    }
}

/// Extract from an in-memory payload: PDFs by magic number, else UTF-8 text.
pub fn extract_in_memory(bytes: Vec<u8>, label: &str) -> Result<ExtractedText> {
    let byte_size = bytes.len() as u64;
    if pdf::is_pdf(&bytes) {
        return Ok(ExtractedText {
            text: pdf::extract_pdf_text(&bytes)?,
            byte_size,
            method: ExtractionMethod::PdfText,
        });
    }
    let text = file::decode_text(bytes, FileType::Unknown, Path::new(label))?;
    Ok(ExtractedText {
        text,
        byte_size,
        method: ExtractionMethod::PlainText,
    })
}
