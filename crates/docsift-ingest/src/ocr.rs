//! OCR fallback for scanned PDFs.
//!
//! The default backend shells out to poppler's `pdftoppm` to rasterise
//! pages and to `tesseract` to read them, one page at a time.

use std::path::{Path, PathBuf};
use std::process::Command;

use docsift_core::{Error, Result};
use tracing::debug;

/// Turns a PDF on disk into per-page text, in page order.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    fn ocr_pdf(&self, path: &Path) -> Result<Vec<String>>;
}

/// OCR disabled: every call fails.
pub struct NoOcr;

impl OcrBackend for NoOcr {
    fn name(&self) -> &str {
        "none"
    }

    fn ocr_pdf(&self, path: &Path) -> Result<Vec<String>> {
        Err(Error::Extraction(format!(
            "no text layer in {} and OCR is disabled",
            path.display()
        )))
    }
}

/// `pdftoppm` + `tesseract` command-line backend.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub pdftoppm: PathBuf,
    pub tesseract: PathBuf,
    pub language: String,
    pub dpi: u32,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}

impl TesseractCli {
    fn rasterise(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let output = Command::new(&self.pdftoppm)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(out_dir.join("page"))
            .output()
            .map_err(|e| Error::Extraction(format!("OCR backend unavailable (pdftoppm): {}", e)))?;

        if !output.status.success() {
            return Err(Error::Extraction(format!(
                "OCR backend error (pdftoppm): {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|p| page_number(&p).map(|n| (n, p)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);
        Ok(pages.into_iter().map(|(_, p)| p).collect())
    }

    fn read_page(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| Error::Extraction(format!("OCR backend unavailable (tesseract): {}", e)))?;

        if !output.status.success() {
            return Err(Error::Extraction(format!(
                "OCR backend error (tesseract): {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrBackend for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn ocr_pdf(&self, path: &Path) -> Result<Vec<String>> {
        let dir = tempfile::tempdir()?;
        let images = self.rasterise(path, dir.path())?;
        debug!("Rasterised {} pages from {}", images.len(), path.display());

        images.iter().map(|img| self.read_page(img)).collect()
    }
}

/// Page number from a `pdftoppm` output name such as `page-07.png`.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('-').next()?.parse().ok()
}
