//! # yaMDB Backend Library
//!
//! REST backend for yaMDB, a media review platform. Users sign in with a
//! one-time code sent to their email, then review titles (books, films,
//! music) and comment on each other's reviews.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **SQLx**: asynchronous SQLite access
//! - **jsonwebtoken**: signed access tokens
//! - **lettre**: confirmation-code delivery
//!
//! ## Core Components
//!
//! - [`auth`]: confirmation codes and access tokens
//! - [`config`]: layered configuration
//! - [`db`]: pool setup and schema
//! - [`error`]: the API error type and field validators
//! - [`mail`]: outgoing mail backends
//! - [`middleware`]: rate limiting, security headers, authentication and role checks
//! - [`pagination`]: page-number pagination envelope
//! - [`routes`]: HTTP API endpoint handlers and the router
//! - [`state`]: shared application state

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod mail;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
