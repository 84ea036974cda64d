//! # Configuration Management
//!
//! This module loads the service configuration from multiple sources:
//! - Built-in defaults (the `Default` impl below)
//! - An optional TOML configuration file (config.toml)
//! - Environment variables (with APP_ prefix, `__` between nested keys)
//! - Platform variables (`HOST`, `PORT`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Converts between Rust structs and TOML / environment data
//! - **derive macros**: Generate Debug, Clone, Serialize, Deserialize for us
//! - **Result<T, E>**: Loading can fail, so every step returns a Result
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Platform variables (PORT, OPENAI_API_KEY, ...)
//! 2. APP_ variables (APP_DOWNLOAD__TIMEOUT_SECS, APP_SERVER__HOST, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values
//!
//! The configuration is read once at startup and never changes afterwards.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Largest audio file accepted for transcription: 100 MiB.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Wall-clock budget for a single download, in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each group maps to one part of the request pipeline: the HTTP listener,
/// the speech-to-text provider and the audio download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transcription: TranscriptionConfig,
    pub download: DownloadConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: Interface to bind ("0.0.0.0" accepts connections on every interface)
/// - `port`: TCP port number to listen on (defaults to 3000)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Speech-to-text provider settings.
///
/// ## Fields:
/// - `api_key`: Bearer credential for the provider
/// - `base_url`: API root, override it to target a compatible gateway
/// - `model`: Model identifier sent with every request ("whisper-1")
/// - `language`, `prompt`, `temperature`: Optional tuning values, only sent when set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Limits and storage location for downloaded audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory that holds in-flight downloads (created on demand)
    pub tmp_dir: PathBuf,
    /// Size ceiling in bytes
    pub max_bytes: u64,
    /// Time budget for one download, in seconds
    pub timeout_secs: u64,
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// The service can start with nothing but an API key in the environment;
/// everything else has a sensible value here.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            transcription: TranscriptionConfig {
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "whisper-1".to_string(),
                language: None,
                prompt: None,
                temperature: None,
            },
            download: DownloadConfig {
                tmp_dir: PathBuf::from("tmp"),
                max_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
                timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from every source in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=127.0.0.1`: Override server host
    /// - `APP_DOWNLOAD__TMP_DIR=/var/tmp/stt`: Move the download directory
    /// - `APP_TRANSCRIPTION__LANGUAGE=pt`: Pin the transcription language
    /// - `PORT=3000`: Special case for deployment platforms
    /// - `OPENAI_API_KEY=sk-...`: Provider credential
    /// - `OPENAI_BASE_URL=http://gateway/v1`: Provider endpoint override
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Names used by process managers and provider SDKs, kept outside the APP_ convention
        let overrides = [
            ("HOST", "server.host"),
            ("PORT", "server.port"),
            ("OPENAI_API_KEY", "transcription.api_key"),
            ("OPENAI_BASE_URL", "transcription.base_url"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = env::var(var) {
                settings = settings.set_override(key, value)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - A provider credential and endpoint are present
    /// - The download ceiling and time budget are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.transcription.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Transcription API key is missing (set OPENAI_API_KEY)"
            ));
        }

        if self.transcription.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Transcription base URL cannot be empty"));
        }

        if self.download.max_bytes == 0 {
            return Err(anyhow::anyhow!("Download size ceiling must be greater than 0"));
        }

        if self.download.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Download timeout must be greater than 0"));
        }

        Ok(())
    }
}
