#[cfg(test)]
mod tests {
    use crate::error::{validation, AppError, AppResult, OptionExt};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let error = AppError::BadRequest("Invalid input".to_string());
        assert_eq!(format!("{}", error), "Bad request: Invalid input");

        let error = AppError::Forbidden("Admin role required".to_string());
        assert_eq!(format!("{}", error), "Forbidden: Admin role required");

        let error = AppError::RateLimited { retry_after_seconds: 60 };
        assert_eq!(format!("{}", error), "Rate limited. Retry after 60 seconds");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::RateLimited { retry_after_seconds: 30 }, StatusCode::TOO_MANY_REQUESTS),
            (AppError::validation("score", "bad"), StatusCode::BAD_REQUEST),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let (status, body) = body_json(AppError::validation("year", "Year is in the future.")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "year");
        assert_eq!(body["error"]["details"]["message"], "Year is in the future.");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("secret detail"));
        assert!(body["error"]["details"]["error_id"].is_string());
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_option_ext() {
        let found: AppResult<i32> = Some(3).ok_or_not_found("Title");
        assert_eq!(found.unwrap(), 3);

        let missing: AppResult<i32> = None.ok_or_not_found("Title");
        match missing {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Title not found"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_text_validators() {
        assert!(validation::validate_required_text("ok", "text", None).is_ok());
        assert!(validation::validate_required_text("  ", "text", None).is_err());
        assert!(validation::validate_max_chars("ab", "name", 2).is_ok());
        assert!(validation::validate_max_chars("abc", "name", 2).is_err());
        // Characters, not bytes
        assert!(validation::validate_max_chars("äöü", "name", 3).is_ok());
    }

    #[test]
    fn test_slug_and_username_validators() {
        assert!(validation::validate_slug("sci-fi_2", "slug").is_ok());
        assert!(validation::validate_slug("sci fi", "slug").is_err());
        assert!(validation::validate_slug(&"a".repeat(51), "slug").is_err());

        assert!(validation::validate_username("j.doe+test@x").is_ok());
        assert!(validation::validate_username("me").is_err());
        assert!(validation::validate_username("bad name").is_err());
    }

    #[test]
    fn test_year_and_score_validators() {
        use chrono::Datelike;
        let current = i64::from(chrono::Utc::now().year());
        assert!(validation::validate_year(current).is_ok());
        assert!(validation::validate_year(current + 1).is_err());
        assert!(validation::validate_year(0).is_err());

        for score in [1, 10] {
            assert!(validation::validate_score(score).is_ok());
        }
        for score in [0, 11, -3] {
            assert!(validation::validate_score(score).is_err());
        }
    }

    #[test]
    fn test_email_validator() {
        assert!(validation::validate_email("user@example.com").is_ok());
        assert!(validation::validate_email("user@").is_err());
        assert!(validation::validate_email("").is_err());
    }
}
