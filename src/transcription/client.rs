use crate::config::TranscriptionConfig;
use crate::error::{AppError, AppResult};
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Transcript returned to the caller of `POST /transcribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
}

/// Provider response body. Only `text` matters; a missing field means an
/// empty transcript, not a failure.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Provider error envelope: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for the hosted speech-to-text API.
#[derive(Debug, Clone)]
pub struct WhisperClient {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl WhisperClient {
    pub fn new(client: reqwest::Client, config: TranscriptionConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Upload the file at `path` and return its transcript.
    ///
    /// ## Request:
    /// `multipart/form-data` with `file` (streamed from disk, named after the
    /// local file so the provider can detect the format), `model`, and the
    /// optional `language` / `prompt` / `temperature` fields when configured.
    ///
    /// ## Errors:
    /// Every failure (file access, network, non-success status, unreadable
    /// body) is reported as `AppError::Internal`.
    pub async fn transcribe(&self, path: &Path) -> AppResult<TranscriptionResult> {
        let file = File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.ogg".to_string());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let file_part = multipart::Part::stream_with_length(body, length).file_name(file_name);

        let mut form = multipart::Form::new()
            .text("model", self.config.model.clone())
            .part("file", file_part);
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &self.config.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if let Some(temperature) = self.config.temperature {
            form = form.text("temperature", temperature.to_string());
        }

        debug!(model = %self.config.model, size_bytes = length, "Sending audio for transcription");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(AppError::internal(format!(
                "{} {}",
                status.as_u16(),
                detail.trim()
            )));
        }

        let parsed: TranscriptionResponse = response.json().await?;
        let text = parsed.text.unwrap_or_default();

        info!(chars = text.len(), "Transcription completed");

        Ok(TranscriptionResult { text })
    }
}
