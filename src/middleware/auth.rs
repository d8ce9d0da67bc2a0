//! Bearer-token authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::AppError;
use crate::models::{Role, User, USER_COLUMNS};
use crate::state::AppState;

/// The caller, resolved from `Authorization: Bearer <token>`.
///
/// The token only identifies the user; the row is reloaded so that role changes and
/// deleted accounts take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into()))?;

        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
            .bind(claims.sub)
            .fetch_optional(&state.db)
            .await?;
        let user = user.ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

        Ok(AuthUser { id: user.id, username: user.username, role: user.role })
    }
}
