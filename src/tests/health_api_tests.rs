#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::models::Role;
    use crate::tests::TestApp;

    async fn raw_get(app: &TestApp, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = app
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_endpoint() {
        let app = TestApp::new().await;
        let (status, _, body) = raw_get(&app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_readyz_endpoint() {
        let app = TestApp::new().await;
        let (status, _, body) = raw_get(&app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ready");
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/version", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "yamdb");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_metrics_count_activity() {
        let app = TestApp::new().await;
        let (_, admin) = app.user("admin", Role::Admin).await;
        let _ = app.post("/v1/titles/", Some(&admin), json!({"name": "Solaris", "year": 1972})).await;

        let (status, body) = app.get("/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["titles_created"], 1);
        assert_eq!(body["reviews_created"], 0);

        let (status, headers, text) = raw_get(&app, "/metrics/prometheus").await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
        assert!(text.contains("# TYPE yamdb_titles_created counter"));
        assert!(text.contains("yamdb_titles_created 1"));
        assert!(text.contains("# TYPE yamdb_uptime_seconds gauge"));
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let app = TestApp::new().await;
        let (_, headers, _) = raw_get(&app, "/v1/categories/").await;
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    }
}
