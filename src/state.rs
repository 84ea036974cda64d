//! # Application State
//!
//! The context object shared by every HTTP request handler. It is built once
//! at startup and is read-only afterwards, so no locking is needed.
//!
//! ## Key Rust Concepts:
//! - **Cheap clones**: Each actix worker gets its own clone; the HTTP client
//!   inside is reference counted, so all workers share one connection pool
//!
//! ### Why not globals:
//! The HTTP client, transcription client and temp directory are passed in
//! explicitly through `web::Data<AppState>`. Tests build their own state
//! pointing at mock servers and temporary directories.

use crate::config::AppConfig;
use crate::download::{DownloadLimits, Fetcher};
use crate::transcription::WhisperClient;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Downloads audio into `config.download.tmp_dir`
    pub fetcher: Fetcher,

    /// Talks to the speech-to-text provider
    pub transcriber: WhisperClient,
}

impl AppState {
    /// Build the request context from the loaded configuration.
    ///
    /// One `reqwest::Client` (and therefore one connection pool) is shared by
    /// the fetcher and the transcription client.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Fetcher::http_client()?;
        let fetcher = Fetcher::new(
            client.clone(),
            config.download.tmp_dir.clone(),
            DownloadLimits::from(&config.download),
        );
        let transcriber = WhisperClient::new(client, config.transcription.clone());

        Ok(Self {
            fetcher,
            transcriber,
        })
    }
}
