//! # Fetcher
//!
//! Downloads one remote audio file into the temporary directory.
//!
//! ## Download Flow:
//! 1. Create the destination directory if it does not exist yet
//! 2. GET the URL (redirects followed) under a per-download cancellation token
//! 3. Reject non-success statuses and declared sizes above the ceiling
//! 4. Pick an extension and a random file name (`audio_<uuid><ext>`)
//! 5. Stream the body chunk by chunk into the file
//! 6. Re-read the size from disk and reject empty files
//!
//! ## Rust Concepts:
//! - **CancellationToken**: A cheap, clonable "stop" signal fired by the
//!   deadline when the time budget runs out
//! - **tokio::select!**: Races the transfer against the token; the losing
//!   future is dropped, which aborts the in-flight request
//! - **Streams**: `bytes_stream()` yields the body in chunks so memory use
//!   stays flat whatever the file size
//! - **Drop**: The file is held as a `tempfile::TempPath`, which deletes it
//!   when dropped. Errors, timeouts and abandoned requests (a client that
//!   disconnects drops the handler future) all clean up the same way.

use crate::config::{DownloadConfig, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MAX_DOWNLOAD_BYTES};
use crate::download::infer_extension;
use crate::error::{AppError, AppResult};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Maximum number of redirects followed for one download.
const MAX_REDIRECTS: usize = 20;

/// Size ceiling and time budget applied to every download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadLimits {
    pub max_bytes: u64,
    pub timeout: Duration,
}

impl Default for DownloadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

impl From<&DownloadConfig> for DownloadLimits {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
        }
    }
}

/// A file written by the fetcher, owned by the request that asked for it.
///
/// The file on disk lives exactly as long as this value.
#[derive(Debug)]
pub struct DownloadedAudio {
    file: TempPath,
    pub size_bytes: u64,
    /// Extension with its leading dot, e.g. ".ogg"
    pub extension: &'static str,
}

impl DownloadedAudio {
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Delete the file now. Failures are logged and never reach the caller.
    pub fn discard(self) {
        let path = self.file.to_path_buf();
        if let Err(err) = self.file.close() {
            debug!(path = %path.display(), error = %err, "Temporary file cleanup failed");
        }
    }
}

/// Downloads audio into a shared directory.
///
/// Cloning is cheap: `reqwest::Client` is reference counted internally, so
/// every clone shares one connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    dir: PathBuf,
    limits: DownloadLimits,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, dir: impl Into<PathBuf>, limits: DownloadLimits) -> Self {
        Self {
            client,
            dir: dir.into(),
            limits,
        }
    }

    /// HTTP client configured the way downloads expect (redirects followed).
    pub fn http_client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn limits(&self) -> DownloadLimits {
        self.limits
    }

    /// Download `url` into the temporary directory.
    ///
    /// ## Errors:
    /// - `DownloadFailed` for non-success statuses
    /// - `PayloadTooLarge` when the size ceiling is exceeded
    /// - `EmptyDownload` when the transfer produced zero bytes
    /// - `DownloadTimeout` when the time budget runs out
    /// - `Internal` for network and filesystem failures
    pub async fn fetch(&self, url: &str) -> AppResult<DownloadedAudio> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let cancel = CancellationToken::new();
        // Lives inside this future, so dropping `fetch` also drops the timer
        let deadline = async {
            tokio::time::sleep(self.limits.timeout).await;
            cancel.cancel();
            std::future::pending::<Infallible>().await
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::DownloadTimeout),
            never = deadline => match never {},
            result = self.transfer(url) => result,
        }
    }

    async fn transfer(&self, url: &str) -> AppResult<DownloadedAudio> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        info!(
            content_type = %content_type.as_deref().unwrap_or("(empty)"),
            "Content-Type"
        );

        if let Some(declared) = response.content_length() {
            if declared > self.limits.max_bytes {
                return Err(AppError::PayloadTooLarge);
            }
        }

        let extension = infer_extension(content_type.as_deref(), url);
        let file_path = self.dir.join(format!("audio_{}{}", Uuid::new_v4(), extension));

        let mut file = File::create(&file_path).await?;
        // From here on every early return deletes the partial file
        let guard = TempPath::from_path(file_path);

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            // Content-Length is optional, so the ceiling is enforced here as well
            if written > self.limits.max_bytes {
                return Err(AppError::PayloadTooLarge);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let size_bytes = tokio::fs::metadata(&guard).await?.len();
        if size_bytes == 0 {
            return Err(AppError::EmptyDownload);
        }

        debug!(
            path = %guard.display(),
            size_bytes,
            extension,
            "Download complete"
        );

        Ok(DownloadedAudio {
            file: guard,
            size_bytes,
            extension,
        })
    }
}
