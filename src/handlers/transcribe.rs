//! # Transcription REST API Handler
//!
//! `POST /transcribe` downloads the audio referenced by `url`, sends it to the
//! speech-to-text provider and answers with the transcript.
//!
//! ## Request:
//! ```json
//! { "url": "https://cdn.example.com/voice/123.ogg" }
//! ```
//!
//! ## Responses:
//! - `200 {"text": "..."}` (the transcript may be empty)
//! - `400 {"error": "..."}` invalid input, failed download, empty download
//! - `413 {"error": "..."}` audio larger than the size ceiling
//! - `500 {"error": "..."}` download timeout, provider or filesystem failure

use crate::error::{AppError, AppResult};
use crate::health;
use crate::state::AppState;
use crate::transcription::TranscriptionResult;
use actix_web::{web, HttpResponse};
use serde_json::Value;
use tracing::{debug, warn};

/// Largest JSON body accepted by `POST /transcribe`.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Validated body of `POST /transcribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub url: String,
}

impl TranscriptionRequest {
    /// Pull a usable `url` out of an arbitrary JSON body.
    ///
    /// The value must be a non-empty string. Scheme and reachability are not
    /// checked here; the download reports those problems.
    pub fn from_body(body: &Value) -> AppResult<Self> {
        body.get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(|url| Self {
                url: url.to_string(),
            })
            .ok_or(AppError::InvalidInput)
    }
}

/// Register the public routes. Shared by `main` and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health::health_check))
        .route("/transcribe", web::post().to(transcribe));
}

/// Malformed, oversized or non-JSON bodies are reported like a missing `url`.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            debug!(error = %err, "Rejected request body");
            AppError::InvalidInput.into()
        })
}

pub async fn transcribe(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let request = TranscriptionRequest::from_body(&body)?;

    match run_pipeline(&state, &request).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(err) => {
            warn!(url = %request.url, error = %err, "Transcription request failed");
            Err(err)
        }
    }
}

/// Download → transcribe → delete. The downloaded file is removed whether or
/// not the provider call succeeded, and also when this future is dropped
/// before finishing (the client went away).
async fn run_pipeline(state: &AppState, request: &TranscriptionRequest) -> AppResult<TranscriptionResult> {
    let audio = state.fetcher.fetch(&request.url).await?;

    debug!(
        path = %audio.path().display(),
        size_bytes = audio.size_bytes,
        extension = audio.extension,
        "Audio downloaded"
    );

    let outcome = state.transcriber.transcribe(audio.path()).await;
    audio.discard();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::download::{DownloadLimits, Fetcher};
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, App};
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(provider: &MockServer, tmp: &Path, limits: DownloadLimits) -> AppState {
        let mut config = AppConfig::default();
        config.transcription.api_key = "sk-test".to_string();
        config.transcription.base_url = provider.uri();
        config.download.tmp_dir = tmp.to_path_buf();

        let mut state = AppState::new(&config).unwrap();
        state.fetcher = Fetcher::new(Fetcher::http_client().unwrap(), tmp, limits);
        state
    }

    async fn mount_provider(provider: &MockServer, text: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": text })))
            .expect(expected_calls)
            .mount(provider)
            .await;
    }

    async fn mount_audio(audio: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(audio)
            .await;
    }

    fn ogg_body() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_bytes(vec![9u8; 32])
            .insert_header("content-type", "audio/ogg")
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    fn post(body: Value) -> actix_test::TestRequest {
        actix_test::TestRequest::post().uri("/transcribe").set_json(body)
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(
            TranscriptionRequest::from_body(&json!({ "url": "https://a/b.ogg" })).unwrap(),
            TranscriptionRequest {
                url: "https://a/b.ogg".to_string()
            }
        );
        assert!(TranscriptionRequest::from_body(&json!({})).is_err());
        assert!(TranscriptionRequest::from_body(&json!({ "url": "" })).is_err());
        assert!(TranscriptionRequest::from_body(&json!({ "url": 42 })).is_err());
        assert!(TranscriptionRequest::from_body(&json!({ "url": ["https://a"] })).is_err());
        assert!(TranscriptionRequest::from_body(&json!("https://a")).is_err());
    }

    #[actix_web::test]
    async fn test_invalid_input_never_fetches() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ogg_body())
            .expect(0)
            .mount(&audio)
            .await;
        mount_provider(&provider, "unused", 0).await;

        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        for body in [json!({}), json!({ "url": 42 }), json!({ "url": null }), json!({ "uri": audio.uri() })] {
            let resp = actix_test::call_service(&app, post(body).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = actix_test::read_body_json(resp).await;
            assert!(body["error"].as_str().unwrap().contains("url"));
        }

        // Not JSON at all
        let req = actix_test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_successful_transcription_cleans_up() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        mount_provider(&provider, "bom dia", 1).await;
        mount_audio(&audio, "/voice.ogg", ogg_body()).await;

        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let resp = actix_test::call_service(
            &app,
            post(json!({ "url": format!("{}/voice.ogg", audio.uri()) })).to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({ "text": "bom dia" }));
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[actix_web::test]
    async fn test_repeated_requests_are_independent() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        mount_provider(&provider, "again", 2).await;
        mount_audio(&audio, "/voice.ogg", ogg_body()).await;

        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let url = format!("{}/voice.ogg", audio.uri());
        for _ in 0..2 {
            let resp = actix_test::call_service(&app, post(json!({ "url": url })).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(file_count(tmp.path()), 0);

        // Each upload carried its own temporary file name
        let uploads = provider.received_requests().await.unwrap();
        let names: Vec<String> = uploads
            .iter()
            .filter_map(|request| {
                let body = String::from_utf8_lossy(&request.body).to_string();
                let start = body.find("filename=\"")? + "filename=\"".len();
                let end = body[start..].find('"')? + start;
                Some(body[start..end].to_string())
            })
            .collect();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        assert!(names.iter().all(|name| name.starts_with("audio_") && name.ends_with(".ogg")));
    }

    #[actix_web::test]
    async fn test_download_errors_map_to_statuses() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        mount_provider(&provider, "unused", 0).await;
        mount_audio(&audio, "/missing.ogg", ResponseTemplate::new(404)).await;
        mount_audio(&audio, "/empty.ogg", ResponseTemplate::new(200)).await;
        mount_audio(
            &audio,
            "/big.mp3",
            ResponseTemplate::new(200).set_body_bytes(vec![0u8; 256]),
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let limits = DownloadLimits {
            max_bytes: 128,
            ..DownloadLimits::default()
        };
        let state = test_state(&provider, tmp.path(), limits);
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let cases = [
            ("/missing.ogg", StatusCode::BAD_REQUEST, "Failed to download audio (404)"),
            ("/empty.ogg", StatusCode::BAD_REQUEST, "Empty download."),
            ("/big.mp3", StatusCode::PAYLOAD_TOO_LARGE, "File is larger than allowed."),
        ];
        for (route, status, message) in cases {
            let url = format!("{}{}", audio.uri(), route);
            let resp = actix_test::call_service(&app, post(json!({ "url": url })).to_request()).await;
            assert_eq!(resp.status(), status, "route {}", route);
            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body, json!({ "error": message }));
        }
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[actix_web::test]
    async fn test_download_timeout_is_distinct_500() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        mount_provider(&provider, "unused", 0).await;
        mount_audio(&audio, "/slow.ogg", ogg_body().set_delay(Duration::from_secs(5))).await;

        let tmp = tempfile::tempdir().unwrap();
        let limits = DownloadLimits {
            timeout: Duration::from_millis(100),
            ..DownloadLimits::default()
        };
        let state = test_state(&provider, tmp.path(), limits);
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let url = format!("{}/slow.ogg", audio.uri());
        let resp = actix_test::call_service(&app, post(json!({ "url": url })).to_request()).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Download timed out." }));
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[actix_web::test]
    async fn test_provider_failure_is_500_and_cleans_up() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided" }
            })))
            .mount(&provider)
            .await;
        mount_audio(&audio, "/voice.ogg", ogg_body()).await;

        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let url = format!("{}/voice.ogg", audio.uri());
        let resp = actix_test::call_service(&app, post(json!({ "url": url })).to_request()).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = actix_test::read_body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("Incorrect API key provided"));
        assert_ne!(message, "Download timed out.");
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[actix_web::test]
    async fn test_concurrent_requests_do_not_interfere() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        mount_provider(&provider, "first", 1).await;
        mount_audio(&audio, "/ok.ogg", ogg_body()).await;
        mount_audio(&audio, "/gone.ogg", ResponseTemplate::new(410)).await;

        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let ok = post(json!({ "url": format!("{}/ok.ogg", audio.uri()) })).to_request();
        let gone = post(json!({ "url": format!("{}/gone.ogg", audio.uri()) })).to_request();
        let (ok, gone) = futures_util::future::join(
            actix_test::call_service(&app, ok),
            actix_test::call_service(&app, gone),
        )
        .await;

        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(gone.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(ok).await;
        assert_eq!(body["text"], "first");
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[actix_web::test]
    async fn test_abandoned_request_leaves_no_file() {
        let provider = MockServer::start().await;
        let audio = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "text": "late" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&provider)
            .await;
        mount_audio(&audio, "/voice.ogg", ogg_body()).await;

        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let request = TranscriptionRequest {
            url: format!("{}/voice.ogg", audio.uri()),
        };

        // Dropped while waiting on the provider, as when a client disconnects
        let abandoned =
            tokio::time::timeout(Duration::from_millis(800), run_pipeline(&state, &request)).await;

        assert!(abandoned.is_err());
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[actix_web::test]
    async fn test_health_route_is_registered() {
        let provider = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&provider, tmp.path(), DownloadLimits::default());
        let app = actix_test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ok"], true);
    }
}
