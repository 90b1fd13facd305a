//! Configuration and data directory management.
//!
//! Resolved once at startup: defaults, then an optional JSON file, then
//! environment overrides. The result is validated and shared read-only.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Paths to all docsift data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Document store directory (`data/db/`).
    pub db: PathBuf,
    /// Remote documents fetched in download mode (`data/downloads/`).
    pub downloads: PathBuf,
    /// Default folder scanned by folder batches (`data/pdfs/`).
    pub default_folder: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let paths = Self::layout(root);
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Compute the layout without touching the filesystem.
    pub fn layout(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            db: root.join("db"),
            downloads: root.join("downloads"),
            default_folder: root.join("pdfs"),
            root,
        }
    }

    /// Create all required directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.db)?;
        std::fs::create_dir_all(&self.downloads)?;
        std::fs::create_dir_all(&self.default_folder)?;
        Ok(())
    }
}

/// Paragraph-count upper bounds for the length categories.
///
/// `paragraphs <= short` is Short, `paragraphs <= medium` is Medium,
/// anything above is Long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthThresholds {
    pub short: usize,
    pub medium: usize,
}

impl Default for LengthThresholds {
    fn default() -> Self {
        Self {
            short: 10,
            medium: 50,
        }
    }
}

/// One step of the summary-length function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBand {
    /// Inclusive upper bound on input tokens; `None` for the open last band.
    pub up_to_tokens: Option<usize>,
    pub min_length: usize,
    pub max_length: usize,
}

/// Summary and keyword parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Input is truncated to this many tokens before summarizing.
    pub max_input_tokens: usize,
    /// Keywords kept per document.
    pub top_n: usize,
    /// Short, medium, long and very-long text bands, ascending.
    pub bands: [SummaryBand; 4],
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            top_n: 10,
            bands: [
                SummaryBand { up_to_tokens: Some(100), min_length: 20, max_length: 50 },
                SummaryBand { up_to_tokens: Some(500), min_length: 30, max_length: 100 },
                SummaryBand { up_to_tokens: Some(1000), min_length: 50, max_length: 150 },
                SummaryBand { up_to_tokens: None, min_length: 100, max_length: 300 },
            ],
        }
    }
}

impl EnrichmentConfig {
    /// Pick the band for a (truncated) token count.
    pub fn band_for(&self, tokens: usize) -> SummaryBand {
        self.bands
            .iter()
            .copied()
            .find(|b| b.up_to_tokens.map_or(true, |limit| tokens <= limit))
            .unwrap_or(self.bands[3])
    }
}

/// Top-level docsift configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsiftConfig {
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Extensions picked up by folder scans, without the dot.
    pub extensions: Vec<String>,
    /// Override for the folder scanned when a folder batch names none.
    pub default_folder: Option<PathBuf>,
    pub thresholds: LengthThresholds,
    pub enrichment: EnrichmentConfig,
    /// Worker pool size; `None` means available parallelism.
    pub concurrency: Option<usize>,
    pub http_timeout_secs: u64,
    /// Download manifest URLs to disk instead of extracting in memory.
    pub manifest_download: bool,
    /// Attach CPU/memory samples to item observations.
    pub sample_resources: bool,
}

impl Default for DocsiftConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extensions: vec!["pdf".to_string()],
            default_folder: None,
            thresholds: LengthThresholds::default(),
            enrichment: EnrichmentConfig::default(),
            concurrency: None,
            http_timeout_secs: 60,
            manifest_download: false,
            sample_resources: true,
        }
    }
}

impl DocsiftConfig {
    /// Defaults, overlaid by an optional JSON file, overlaid by environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        tracing::debug!(
            data_dir = %config.data_dir.display(),
            concurrency = config.effective_concurrency(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("DOCSIFT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(n) = std::env::var("DOCSIFT_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.concurrency = Some(n);
        }
        if let Ok(folder) = std::env::var("DOCSIFT_DEFAULT_FOLDER") {
            self.default_folder = Some(PathBuf::from(folder));
        }
    }

    /// Reject configurations the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.thresholds.short >= self.thresholds.medium {
            return Err(Error::Config(format!(
                "length thresholds must ascend: short={} medium={}",
                self.thresholds.short, self.thresholds.medium
            )));
        }
        if self.enrichment.max_input_tokens == 0 {
            return Err(Error::Config("max_input_tokens must be positive".into()));
        }
        if self.enrichment.top_n == 0 {
            return Err(Error::Config("top_n must be positive".into()));
        }
        let bands = &self.enrichment.bands;
        for pair in bands.windows(2) {
            let ascending = match (pair[0].up_to_tokens, pair[1].up_to_tokens) {
                (Some(a), Some(b)) => a < b,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !ascending || pair[0].max_length > pair[1].max_length {
                return Err(Error::Config("summary bands must be monotone".into()));
            }
        }
        if bands.iter().any(|b| b.min_length > b.max_length) {
            return Err(Error::Config("summary band min exceeds max".into()));
        }
        if bands[3].up_to_tokens.is_some() {
            return Err(Error::Config("last summary band must be open-ended".into()));
        }
        if self.concurrency == Some(0) {
            return Err(Error::Config("concurrency must be positive".into()));
        }
        Ok(())
    }

    /// Worker pool size to use when the caller does not pass one.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or_else(crate::resources::available_parallelism)
    }

    pub fn data_paths(&self) -> DataPaths {
        let mut paths = DataPaths::layout(&self.data_dir);
        if let Some(folder) = &self.default_folder {
            paths.default_folder = folder.clone();
        }
        paths
    }

    /// Whether a path carries one of the recognised extensions.
    pub fn is_recognized(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}
