//! Remote documents over HTTP.

use std::path::{Path, PathBuf};

use docsift_core::{Error, Result};
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").expect("static regex"));

/// Whether a string is an http(s) URL by prefix, ignoring case.
pub fn is_url(s: &str) -> bool {
    s.get(..4)
        .map(|p| p.eq_ignore_ascii_case("http"))
        .unwrap_or(false)
}

/// Local file name for a downloaded URL: the last path segment with every
/// non-alphanumeric character replaced by `_`.
pub fn download_file_name(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    let last = trimmed.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
    let name = UNSAFE_FILENAME_CHARS.replace_all(last, "_").into_owned();
    if name.is_empty() {
        "download".to_string()
    } else {
        name
    }
}

async fn send(client: &Client, url: &str) -> Result<reqwest::Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Http(format!("network error fetching {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http(format!("{} returned HTTP {}", url, status)));
    }
    Ok(response)
}

/// Fetch a resource fully into memory.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = send(client, url).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("network error reading {}: {}", url, e)))?;
    debug!("Fetched {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

/// Stream a resource into its own subdirectory of `dir`, returning the
/// final path.
///
/// Every call gets a fresh `<dir>/<uuid>/` so URLs sharing a last path
/// segment never overwrite each other. Bytes land in a partial file which
/// is renamed into place once complete.
pub async fn download(client: &Client, url: &str, dir: &Path) -> Result<PathBuf> {
    let response = send(client, url).await?;

    let attempt_dir = dir.join(uuid::Uuid::new_v4().simple().to_string());
    tokio::fs::create_dir_all(&attempt_dir).await?;
    let name = download_file_name(url);
    let target = attempt_dir.join(&name);
    let partial = attempt_dir.join(format!("{}.part", name));

    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(Error::Http(format!("network error reading {}: {}", url, e)));
            }
        };
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&partial, &target).await?;
    info!("Downloaded {} ({} bytes) to {}", url, written, target.display());
    Ok(target)
}
