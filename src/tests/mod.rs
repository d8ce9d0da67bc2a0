//! Integration and unit tests for the yaMDB backend.
//!
//! - **api_tests**: end-to-end requests through the full router
//! - **error_tests**: error envelope and validator behavior
//! - **config_tests**: configuration defaults and validation
//! - **db_tests**: schema constraints and cascades
//! - **health_api_tests**: operational endpoints
//!
//! [`TestApp`] builds the real router over a throwaway SQLite file with the
//! in-memory mail backend, so tests can read confirmation codes from the outbox.

pub mod config_tests;
pub mod db_tests;
pub mod error_tests;
pub mod health_api_tests;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{AppConfig, EmailBackend};
use crate::models::Role;
use crate::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub fn test_config(db_url: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.database.url = db_url.to_string();
    cfg.email.backend = EmailBackend::Memory;
    cfg.auth.jwt_secret = "test-secret".to_string();
    cfg.rate_limit.max_requests = 100_000;
    cfg.rate_limit.auth_max_requests = 100_000;
    cfg.pagination.page_size = 5;
    cfg
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_url = format!("sqlite://{}", dir.path().join("test.db").display());
        let mut cfg = test_config(&db_url);
        adjust(&mut cfg);

        let pool = crate::db::connect(&db_url, 4).await.unwrap();
        crate::db::init_db(&pool).await.unwrap();
        let state = AppState::new(pool, cfg).unwrap();
        let app = crate::routes::router(state.clone());
        Self { app, state, _dir: dir }
    }

    /// Inserts a user directly and returns `(id, access token)`.
    pub async fn user(&self, username: &str, role: Role) -> (i64, String) {
        let id = sqlx::query("INSERT INTO users (username, email, role) VALUES (?1, ?2, ?3)")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind(role)
            .execute(&self.state.db)
            .await
            .unwrap()
            .last_insert_rowid();
        let token = self.state.jwt.issue(id, username, role).unwrap();
        (id, token)
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }
}
