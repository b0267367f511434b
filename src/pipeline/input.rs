//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Text extraction works on a byte buffer, so both local files and
//! downloads end up as `Vec<u8>`. The `%PDF` magic check happens in
//! [`crate::pipeline::extract`], not here, so that in-memory callers get
//! the same validation as file callers.

use crate::error::ReviewError;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Where a document came from, for logs and output metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A local file.
    Local(PathBuf),
    /// Downloaded over HTTP(S).
    Url(String),
}

/// A document loaded into memory.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub source: InputSource,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input string (local path or URL) into memory.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<LoadedInput, ReviewError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(input).await
    }
}

async fn load_local(path_str: &str) -> Result<LoadedInput, ReviewError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) => {
            return Err(match e.kind() {
                IoErrorKind::NotFound => ReviewError::FileNotFound { path },
                IoErrorKind::PermissionDenied => ReviewError::PermissionDenied { path },
                _ => ReviewError::InputUnreadable { path, source: e },
            })
        }
    };

    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedInput {
        source: InputSource::Local(path),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedInput, ReviewError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| ReviewError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ReviewError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_failed(e.to_string()))?;

    info!("Downloaded {} bytes", bytes.len());

    Ok(LoadedInput {
        source: InputSource::Url(url.to_string()),
        bytes: bytes.to_vec(),
    })
}
