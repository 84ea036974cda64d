//! File extension inference for downloaded audio.
//!
//! The provider detects the audio format from the uploaded file name, so the
//! temporary file must carry a plausible extension. Resolution order, first
//! match wins:
//! 1. the response `Content-Type`
//! 2. the trailing extension of the request URL path
//! 3. `.ogg` (voice notes from messaging apps are overwhelmingly ogg/opus)

use reqwest::Url;

/// Extension used when nothing else matches.
pub const DEFAULT_EXTENSION: &str = ".ogg";

/// Content-type fragments and the extension they map to, checked in order.
const CONTENT_TYPE_TABLE: &[(&str, &str)] = &[
    ("audio/ogg", ".ogg"),
    ("application/ogg", ".ogg"),
    ("audio/opus", ".ogg"),
    ("audio/mpeg", ".mp3"),
    ("audio/mp3", ".mp3"),
    ("audio/mp4", ".mp4"),
    ("audio/x-m4a", ".m4a"),
    ("audio/m4a", ".m4a"),
    ("audio/wav", ".wav"),
    ("audio/x-wav", ".wav"),
    ("audio/webm", ".webm"),
    ("audio/flac", ".flac"),
];

/// Path extensions the provider accepts.
const PATH_EXTENSIONS: &[(&str, &str)] = &[
    ("flac", ".flac"),
    ("m4a", ".m4a"),
    ("mp3", ".mp3"),
    ("mp4", ".mp4"),
    ("mpeg", ".mpeg"),
    ("mpga", ".mpga"),
    ("oga", ".oga"),
    ("ogg", ".ogg"),
    ("wav", ".wav"),
    ("webm", ".webm"),
];

/// Infer the extension (with leading dot) for a downloaded file.
///
/// ## Examples:
/// - `Content-Type: audio/mpeg` → `.mp3`, whatever the URL says
/// - no content-type, `https://host/voice/note.WAV?sig=1` → `.wav`
/// - `application/octet-stream`, `https://host/download` → `.ogg`
pub fn infer_extension(content_type: Option<&str>, url: &str) -> &'static str {
    from_content_type(content_type)
        .or_else(|| from_url_path(url))
        .unwrap_or(DEFAULT_EXTENSION)
}

fn from_content_type(content_type: Option<&str>) -> Option<&'static str> {
    let content_type = content_type?.to_ascii_lowercase();
    CONTENT_TYPE_TABLE
        .iter()
        .find(|(fragment, _)| content_type.contains(fragment))
        .map(|(_, ext)| *ext)
}

fn from_url_path(url: &str) -> Option<&'static str> {
    let parsed = Url::parse(url).ok()?;
    let (_, suffix) = parsed.path().rsplit_once('.')?;
    let suffix = suffix.to_ascii_lowercase();
    PATH_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == suffix)
        .map(|(_, ext)| *ext)
}
