//! Best-effort download of the preferred watermark font.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::TilemarkError;

/// Give up on an unreachable host quickly.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for the whole transfer, so a stalled server cannot hold startup.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Make sure `path` exists, downloading it from `url` if it does not.
///
/// Never fails: errors are logged and the font chain falls through to the
/// next candidate.
pub async fn ensure_font(url: &str, path: &Path) {
    if path.exists() {
        debug!(path = %path.display(), "font already cached");
        return;
    }

    info!(url, "downloading watermark font");
    match download(url, path).await {
        Ok(bytes) => info!(path = %path.display(), bytes, "font downloaded"),
        Err(e) => error!(url, error = %e, "font download failed"),
    }
}

/// Download `url` into `path` through a temporary sibling file.
async fn download(url: &str, path: &Path) -> Result<usize, TilemarkError> {
    let client = reqwest::Client::builder()
        .user_agent("tilemark/0.1")
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| TilemarkError::Font(format!("HTTP client error: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TilemarkError::Font(format!("Failed to download {}: {}", url, e)))?;
    if !response.status().is_success() {
        return Err(TilemarkError::Font(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| TilemarkError::Font(format!("Failed to read font data: {}", e)))?;

    store_font(&bytes, path).await?;
    Ok(bytes.len())
}

/// Write `bytes` to `path` via a `.part` sibling, removing it if either step fails.
async fn store_font(bytes: &[u8], path: &Path) -> Result<(), TilemarkError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(path);
    let written = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %cleanup, "could not remove partial font");
            }
        }
        return Err(e.into());
    }
    Ok(())
}

/// `font.otf` -> `font.otf.part`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
