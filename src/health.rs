use actix_web::HttpResponse;
use serde_json::json;

/// Liveness check: always `{"ok": true, "ts": <epoch-ms>}`.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "ok": true,
        "ts": chrono::Utc::now().timestamp_millis()
    }))
}
