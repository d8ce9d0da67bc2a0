use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error;
use std::fmt;

use crate::mail::EmailError;

/// The primary error type for the application.
///
/// Every handler returns [`AppResult`]; the variant decides the HTTP status and the
/// `error.code` of the JSON envelope.
#[derive(Debug)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    BadRequest(String),
    /// For when a requested resource is not found.
    NotFound(String),
    /// For when a service is temporarily unavailable.
    ServiceUnavailable(String),
    /// For errors related to database operations.
    Database(String),
    /// Missing, malformed or expired credentials.
    Unauthorized(String),
    /// Authenticated, but the role does not allow the operation.
    Forbidden(String),
    /// For when a client has sent too many requests in a given amount of time.
    RateLimited {
        /// The number of seconds to wait before retrying the request.
        retry_after_seconds: u64,
    },
    /// For when a specific field in a request fails validation.
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
}

impl AppError {
    /// Shorthand for [`AppError::ValidationError`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationError { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            AppError::RateLimited { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                tracing::warn!(error = %db_err.message(), "Unique constraint violated");
                AppError::validation("non_field_errors", "A record with this value already exists.")
            }
            sqlx::Error::Database(db_err) => AppError::Database(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            // An id segment that is not a number names no resource.
            PathRejection::FailedToDeserializePathParams(_) => AppError::NotFound("Not found".to_string()),
            other => AppError::Internal(anyhow::anyhow!(other.body_text())),
        }
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        tracing::error!("Mail delivery failed: {}", err);
        AppError::ServiceUnavailable("Could not deliver the confirmation email".to_string())
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that provides a convenient way to convert
/// an `Option` to a `Result` with a `NotFound` error.
pub trait OptionExt<T> {
    /// Converts `None` into `AppError::NotFound("<entity> not found")`.
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}

/// Field validators shared by the request payloads.
pub mod validation {
    use super::*;
    use chrono::Datelike;

    pub fn validate_required_text(value: &str, field: &str, max_chars: Option<usize>) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(AppError::validation(field, "This field may not be blank."));
        }
        if let Some(max) = max_chars {
            validate_max_chars(value, field, max)?;
        }
        Ok(())
    }

    pub fn validate_max_chars(value: &str, field: &str, max_chars: usize) -> AppResult<()> {
        if value.chars().count() > max_chars {
            return Err(AppError::validation(
                field,
                format!("Ensure this field has no more than {} characters.", max_chars),
            ));
        }
        Ok(())
    }

    /// Slugs are ASCII letters, digits, hyphens and underscores.
    pub fn validate_slug(value: &str, field: &str) -> AppResult<()> {
        validate_required_text(value, field, Some(50))?;
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AppError::validation(
                field,
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ));
        }
        Ok(())
    }

    /// Usernames: letters, digits and `@.+-_`, at most 150 characters, never `me`.
    pub fn validate_username(value: &str) -> AppResult<()> {
        validate_required_text(value, "username", Some(150))?;
        if !value.chars().all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')) {
            return Err(AppError::validation(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            ));
        }
        if value == "me" {
            return Err(AppError::validation("username", "The username 'me' is reserved."));
        }
        Ok(())
    }

    pub fn validate_email(value: &str) -> AppResult<()> {
        validate_required_text(value, "email", Some(200))?;
        value
            .parse::<lettre::Address>()
            .map(|_| ())
            .map_err(|_| AppError::validation("email", "Enter a valid email address."))
    }

    /// Publication year must lie in `1..=current year`.
    pub fn validate_year(year: i64) -> AppResult<()> {
        let current = i64::from(chrono::Utc::now().year());
        if !(1..=current).contains(&year) {
            return Err(AppError::validation(
                "year",
                format!("Year must be between 1 and {} inclusive.", current),
            ));
        }
        Ok(())
    }

    pub fn validate_score(score: i64) -> AppResult<()> {
        if !(1..=10).contains(&score) {
            return Err(AppError::validation("score", "Score must be between 1 and 10."));
        }
        Ok(())
    }
}
