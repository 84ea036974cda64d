//! # Audio Download Module
//!
//! Fetches the remote audio referenced by a transcription request into the
//! temporary directory, one uniquely named file per request.
//!
//! ## Key Components:
//! - **Fetcher**: Bounded, cancellable streaming download to disk
//! - **Extension inference**: Picks the file extension from the response
//!   content-type, then the URL path, then falls back to `.ogg`
//!
//! ## Limits:
//! - **Size ceiling**: 100 MiB, checked against `Content-Length` before the
//!   body is read and again while streaming
//! - **Time budget**: 120 seconds per download, enforced with a cancellation token

pub mod extension; // Content-type / URL path → file extension
pub mod fetcher; // Streaming download with size and time limits

pub use extension::infer_extension;
pub use fetcher::{DownloadLimits, Fetcher};
