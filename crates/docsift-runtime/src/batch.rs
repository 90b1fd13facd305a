//! Turning a batch request into work items.
//!
//! Inputs that cannot become a work item are rejected here with
//! `InvalidInput` and never reach the worker pool.

use std::path::{Path, PathBuf};

use docsift_core::{DocsiftConfig, Error, ItemFailure, Result, WorkItem};
use docsift_ingest::remote::is_url;
use tracing::{debug, info};

/// What the caller asked to ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRequest {
    /// Every recognised file directly inside a folder.
    Folder(PathBuf),
    File(PathBuf),
    Url { url: String, download: bool },
    /// JSON object mapping labels to paths or URLs.
    Manifest(PathBuf),
}

impl BatchRequest {
    /// Folder batch over the configured default folder.
    pub fn default_folder(config: &DocsiftConfig) -> Self {
        Self::Folder(config.data_paths().default_folder)
    }
}

/// Work items plus the inputs rejected while expanding.
#[derive(Debug, Default)]
pub struct Expansion {
    pub items: Vec<WorkItem>,
    pub rejected: Vec<(String, ItemFailure)>,
}

impl Expansion {
    fn accept(&mut self, item: WorkItem) {
        self.items.push(item);
    }

    fn reject(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.rejected
            .push((id.into(), ItemFailure::invalid_input(reason)));
    }
}

/// Expand a request. A folder or manifest that cannot be read at all is a
/// batch-level error; bad individual entries are rejections.
pub fn expand(request: &BatchRequest, config: &DocsiftConfig) -> Result<Expansion> {
    let mut out = Expansion::default();
    match request {
        BatchRequest::Folder(dir) => list_folder(dir, config, &mut out)?,
        BatchRequest::File(path) => {
            let id = path.to_string_lossy().to_string();
            if !path.is_file() {
                out.reject(id, "file does not exist");
            } else if !config.is_recognized(path) {
                out.reject(id, "unrecognised file extension");
            } else {
                out.accept(WorkItem::file(id));
            }
        }
        BatchRequest::Url { url, download } => {
            if is_url(url) {
                out.accept(WorkItem::url(url.clone(), *download));
            } else {
                out.reject(url.clone(), "not an http(s) URL");
            }
        }
        BatchRequest::Manifest(path) => read_manifest(path, config, &mut out)?,
    }
    debug!(
        "Expanded batch: {} items, {} rejected",
        out.items.len(),
        out.rejected.len()
    );
    Ok(out)
}

fn list_folder(dir: &Path, config: &DocsiftConfig, out: &mut Expansion) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && config.is_recognized(p))
        .collect();
    paths.sort();

    info!("Found {} documents in {}", paths.len(), dir.display());
    for path in paths {
        out.accept(WorkItem::file(path.to_string_lossy()));
    }
    Ok(())
}

fn read_manifest(path: &Path, config: &DocsiftConfig, out: &mut Expansion) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidInput(format!("cannot read manifest {}: {}", path.display(), e))
    })?;
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| {
            Error::InvalidInput(format!("manifest {} is not a JSON object: {}", path.display(), e))
        })?;

    for (label, value) in entries {
        let Some(entry) = value.as_str() else {
            out.reject(label, "manifest entry is not a string");
            continue;
        };
        if is_url(entry) {
            out.accept(WorkItem::url(entry, config.manifest_download));
        } else if Path::new(entry).is_file() {
            out.accept(WorkItem::file(entry));
        } else {
            out.reject(entry, "neither a URL nor an existing file");
        }
    }
    Ok(())
}
