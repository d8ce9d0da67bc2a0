//! Middleware and request extractors.
//!
//! Cross-cutting concerns layered around the router (rate limiting, security
//! headers) and the extractors that authenticate the caller and enforce roles.

pub mod auth;
pub mod ip;
pub mod permissions;
pub mod rate_limit;
pub mod security_headers;

pub use rate_limit::{EndpointRateLimiter, RateLimiter};
