use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Liveness probe, no DB access
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: DB round trip with a timeout
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let query = sqlx::query("SELECT 1").fetch_one(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

fn counter(out: &mut String, name: &str, help: &str, kind: &str, value: u64) {
    out.push_str(&format!(
        "# HELP yamdb_{name} {help}\n# TYPE yamdb_{name} {kind}\nyamdb_{name} {value}\n"
    ));
}

// Prometheus text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let mut body = String::new();
    counter(&mut body, "codes_sent", "Confirmation codes sent", "counter", m.codes_sent);
    counter(&mut body, "tokens_issued", "Access tokens issued", "counter", m.tokens_issued);
    counter(&mut body, "token_failures", "Rejected code exchanges", "counter", m.token_failures);
    counter(&mut body, "titles_created", "Titles created", "counter", m.titles_created);
    counter(&mut body, "reviews_created", "Reviews created", "counter", m.reviews_created);
    counter(&mut body, "comments_created", "Comments created", "counter", m.comments_created);
    counter(&mut body, "uptime_seconds", "Uptime seconds", "gauge", m.uptime_seconds);
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/build info (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
