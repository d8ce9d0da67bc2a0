//! Email confirmation codes.
//!
//! A code is 32 random hex characters handed to the user by email. Only the SHA-256
//! hex digest is stored on the user row, together with the issue time.

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Returns `(plaintext, digest)`. The plaintext goes into the email, the digest into the database.
pub fn generate() -> (String, String) {
    let plaintext = Uuid::new_v4().simple().to_string();
    let digest = digest(&plaintext);
    (plaintext, digest)
}

pub fn digest(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Checks a submitted code against the stored digest and issue time.
pub fn verify(submitted: &str, stored_digest: Option<&str>, issued_at: Option<i64>, now: i64, ttl_minutes: i64) -> bool {
    let (Some(stored), Some(issued_at)) = (stored_digest, issued_at) else {
        return false;
    };
    if now - issued_at > ttl_minutes * 60 {
        return false;
    }
    constant_time_eq(digest(submitted).as_bytes(), stored.as_bytes())
}
