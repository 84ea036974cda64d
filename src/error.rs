//! # Error Handling
//!
//! This module defines the request-level error taxonomy and how each error is
//! converted to an HTTP response.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Enums for Error Types
//! - **Variants**: Each variant is one way a transcription request can fail
//! - **Data**: Variants carry what the message needs (upstream status, cause text)
//! - **Pattern matching**: `match` picks the HTTP status for each variant
//!
//! ### Traits for Error Conversion
//! - **From trait**: Lets `?` turn io / reqwest / anyhow errors into `AppError`
//! - **ResponseError trait**: Lets actix-web render an `AppError` as a response
//! - **Display trait**: The user-facing message that ends up in the JSON body
//!
//! Every failure is rendered as `{"error": "<message>"}`; nothing escapes the
//! handler as a raw protocol error or stack trace.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Generic message used when an internal failure carries no text of its own.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal error";

/// Everything that can go wrong while serving `POST /transcribe`.
///
/// ## Error Categories:
/// - **InvalidInput**: Body has no usable `url` (400)
/// - **DownloadFailed**: Audio host answered with a non-success status (400)
/// - **PayloadTooLarge**: Audio is bigger than the size ceiling (413)
/// - **EmptyDownload**: Transfer finished with zero bytes (400)
/// - **DownloadTimeout**: Transfer did not finish within the time budget (500)
/// - **Internal**: Network, filesystem or transcription provider failures (500)
#[derive(Debug)]
pub enum AppError {
    InvalidInput,
    DownloadFailed { status: u16 },
    PayloadTooLarge,
    EmptyDownload,
    DownloadTimeout,
    Internal(String),
}

impl AppError {
    /// Build an internal error, falling back to the generic message when the
    /// cause has nothing to say.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            AppError::Internal(GENERIC_INTERNAL_MESSAGE.to_string())
        } else {
            AppError::Internal(message)
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput => {
                write!(f, "Provide \"url\" (string) in the request body.")
            }
            AppError::DownloadFailed { status } => {
                write!(f, "Failed to download audio ({})", status)
            }
            AppError::PayloadTooLarge => write!(f, "File is larger than allowed."),
            AppError::EmptyDownload => write!(f, "Empty download."),
            AppError::DownloadTimeout => write!(f, "Download timed out."),
            AppError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// ## HTTP Status Code Mapping:
/// - InvalidInput / DownloadFailed / EmptyDownload → 400
/// - PayloadTooLarge → 413
/// - DownloadTimeout / Internal → 500
///
/// ## JSON Response Format:
/// ```json
/// { "error": "Failed to download audio (404)" }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput | AppError::DownloadFailed { .. } | AppError::EmptyDownload => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::DownloadTimeout | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Network failures talking to the audio host or the provider.
///
/// Timeouts are not classified here: the download time budget is enforced by
/// a cancellation token in the fetcher, which reports `DownloadTimeout` itself.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
