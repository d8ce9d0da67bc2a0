//! HTTP route handlers for the yaMDB API.
//!
//! - `auth`: confirmation-code and token endpoints
//! - `users`: admin user management and `/users/me/`
//! - `catalog`: categories and genres
//! - `titles`: titles with genre/category links and the rating aggregate
//! - `reviews`, `comments`: nested under a title
//! - `health`: probes, metrics and version info
//!
//! [`router`] wires them together with the middleware every request passes through.

pub mod auth;
pub mod catalog;
pub mod comments;
pub mod health;
pub mod helpers;
pub mod reviews;
pub mod titles;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::middleware::{rate_limit::rate_limit_middleware, security_headers::security_headers_middleware};
use crate::state::{AppState, SEND_CODE_PATH, TOKEN_PATH};

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the API router. Tracing, compression and CORS are added by the binary.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    let api = Router::new()
        .route(SEND_CODE_PATH, post(auth::send_code))
        .route(TOKEN_PATH, post(auth::obtain_token))
        .route("/v1/users/", get(users::list_users).post(users::create_user))
        .route("/v1/users/me/", get(users::get_me).patch(users::update_me))
        .route(
            "/v1/users/{username}/",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/v1/categories/", get(catalog::list_categories).post(catalog::create_category))
        .route("/v1/categories/{slug}/", delete(catalog::delete_category))
        .route("/v1/genres/", get(catalog::list_genres).post(catalog::create_genre))
        .route("/v1/genres/{slug}/", delete(catalog::delete_genre))
        .route("/v1/titles/", get(titles::list_titles).post(titles::create_title))
        .route(
            "/v1/titles/{title_id}/",
            get(titles::get_title).patch(titles::update_title).delete(titles::delete_title),
        )
        .route(
            "/v1/titles/{title_id}/reviews/",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/v1/titles/{title_id}/reviews/{review_id}/",
            get(reviews::get_review).patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route(
            "/v1/titles/{title_id}/reviews/{review_id}/comments/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(comments::get_comment).patch(comments::update_comment).delete(comments::delete_comment),
        )
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .merge(api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn_with_state(cfg, security_headers_middleware))
}
