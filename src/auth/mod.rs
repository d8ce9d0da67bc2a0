//! Authentication primitives.
//!
//! - [`jwt`] -- access-token generation and validation.
//! - [`code`] -- single-use email confirmation codes.

pub mod code;
pub mod jwt;
