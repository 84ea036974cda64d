//! # Transcription Module
//!
//! Sends downloaded audio files to a hosted speech-to-text API (OpenAI's
//! `/audio/transcriptions` endpoint or a compatible gateway) and returns the
//! transcript text.
//!
//! ## Key Components:
//! - **WhisperClient**: Multipart upload of a local file, response parsing
//! - **TranscriptionResult**: The `{ "text": ... }` payload returned to callers
//!
//! The file is streamed from disk into the request body; it is never read
//! fully into memory. No retries are attempted.

pub mod client; // Hosted speech-to-text client

pub use client::{TranscriptionResult, WhisperClient};
