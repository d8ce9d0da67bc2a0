//! The two-step confirmation-code login.
//!
//! `POST /v1/auth/email/` stores a fresh code on the user and mails it.
//! `POST /v1/auth/token/` trades a valid code for an access token; the code is then spent.

use axum::{extract::State, Json};

use crate::{
    auth::code,
    error::{validation, AppError, AppResult, OptionExt},
    extract::ApiJson,
    mail,
    models::{User, USER_COLUMNS},
    state::AppState,
    types::{SendCodeRequest, SendCodeResponse, TokenRequest, TokenResponse},
};

async fn find_by_email(state: &AppState, email: &str) -> AppResult<User> {
    let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS))
        .bind(email)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or_not_found("User with this email")
}

pub async fn send_code(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendCodeRequest>,
) -> AppResult<Json<SendCodeResponse>> {
    let email = req.email.trim();
    validation::validate_email(email)?;
    let user = find_by_email(&state, email).await?;

    let (plaintext, digest) = code::generate();
    sqlx::query("UPDATE users SET confirmation_code = ?1, confirmation_code_issued_at = ?2 WHERE id = ?3")
        .bind(&digest)
        .bind(chrono::Utc::now().timestamp())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    state
        .mailer
        .send(&user.email, mail::confirmation_subject(), &mail::confirmation_body(&plaintext))
        .await?;
    state.metrics.inc_codes_sent();
    tracing::info!(user_id = user.id, "Confirmation code issued");

    Ok(Json(SendCodeResponse { email: user.email }))
}

pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = req.email.trim();
    validation::validate_email(email)?;
    validation::validate_required_text(&req.confirmation_code, "confirmation_code", None)?;
    let user = find_by_email(&state, email).await?;

    let now = chrono::Utc::now().timestamp();
    let valid = code::verify(
        &req.confirmation_code,
        user.confirmation_code.as_deref(),
        user.confirmation_code_issued_at,
        now,
        state.config.auth.confirmation_code_ttl_minutes,
    );

    // Spending the code is conditional on it being unchanged, so two concurrent
    // exchanges of one code cannot both succeed.
    let spent = if valid {
        sqlx::query(
            "UPDATE users SET confirmation_code = NULL, confirmation_code_issued_at = NULL \
             WHERE id = ?1 AND confirmation_code = ?2",
        )
        .bind(user.id)
        .bind(user.confirmation_code.as_deref())
        .execute(&state.db)
        .await?
        .rows_affected()
            == 1
    } else {
        false
    };

    if !spent {
        state.metrics.inc_token_failures();
        tracing::warn!(user_id = user.id, "Rejected confirmation code");
        return Err(AppError::validation("confirmation_code", "Invalid or expired confirmation code."));
    }

    let token = state
        .jwt
        .issue(user.id, &user.username, user.role)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {}", e)))?;
    state.metrics.inc_tokens_issued();
    tracing::info!(user_id = user.id, "Access token issued");

    Ok(Json(TokenResponse { token }))
}
