//! Role-based permission checks.
//!
//! Reads never reach these checks: read-only routes take no credentials at all.
//! Write routes use [`RequireAdmin`] for catalog and user management, and
//! [`ensure_author_or_staff`] for reviews and comments.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin role required".into()));
        }
        Ok(RequireAdmin(user))
    }
}

/// The author of a review or comment may change it; so may moderators and admins.
pub fn can_modify(user: &AuthUser, author_id: i64) -> bool {
    user.is_admin() || user.is_moderator() || user.id == author_id
}

pub fn ensure_author_or_staff(user: &AuthUser, author_id: i64) -> AppResult<()> {
    if can_modify(user, author_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the author, a moderator or an admin may change this".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(id: i64, role: Role) -> AuthUser {
        AuthUser { id, username: format!("u{}", id), role }
    }

    #[test]
    fn author_may_modify_own_content() {
        assert!(can_modify(&user(7, Role::User), 7));
        assert!(!can_modify(&user(8, Role::User), 7));
    }

    #[test]
    fn staff_may_modify_any_content() {
        assert!(can_modify(&user(1, Role::Moderator), 7));
        assert!(can_modify(&user(2, Role::Admin), 7));
    }

    #[test]
    fn denial_is_forbidden() {
        let err = ensure_author_or_staff(&user(8, Role::User), 7).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
