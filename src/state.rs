use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::mail::{EmailError, Mailer};
use crate::metrics::Metrics;
use crate::middleware::{EndpointRateLimiter, RateLimiter};

/// Paths with their own, stricter rate limit.
pub const SEND_CODE_PATH: &str = "/v1/auth/email/";
pub const TOKEN_PATH: &str = "/v1/auth/token/";

/// The shared application state.
///
/// Cloned into every handler and stateful middleware; all members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Signing keys for access tokens.
    pub jwt: JwtKeys,
    /// Delivers confirmation codes.
    pub mailer: Mailer,
    pub metrics: Metrics,
    /// Global per-IP limiter applied to every request.
    pub rate_limiter: RateLimiter,
    /// Per-endpoint limiters for the auth endpoints.
    pub endpoint_limiter: EndpointRateLimiter,
}

impl AppState {
    /// Builds the state from a connected pool and validated configuration.
    ///
    /// Fails only when the configured mail backend cannot be constructed.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Result<Self, EmailError> {
        let rl = &config.rate_limit;
        let rate_limiter = RateLimiter::new(rl.max_requests, rl.window_seconds);
        let endpoint_limiter = EndpointRateLimiter::new().with_limits(vec![
            (SEND_CODE_PATH, rl.auth_max_requests, rl.auth_window_seconds),
            (TOKEN_PATH, rl.auth_max_requests, rl.auth_window_seconds),
        ]);
        let mailer = Mailer::from_config(&config.email)?;
        let jwt = JwtKeys::from_config(&config.auth);

        Ok(Self {
            db,
            config: Arc::new(config),
            jwt,
            mailer,
            metrics: Metrics::new(),
            rate_limiter,
            endpoint_limiter,
        })
    }
}
