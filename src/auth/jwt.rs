//! JWT access tokens.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload. They are
//! issued by `POST /v1/auth/token/` once a confirmation code has been verified.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::Role;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's database id.
    pub sub: i64,
    pub username: String,
    /// Role at issue time. Authorization always re-reads the role from the database.
    pub role: Role,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier.
    pub jti: String,
}

/// Signing material and lifetime for access tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub access_token_ttl_minutes: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, access_token_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_token_ttl_minutes,
        }
    }

    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self::new(&cfg.jwt_secret, cfg.access_token_ttl_minutes)
    }

    /// Issue an access token for the given user.
    pub fn issue(&self, user_id: i64, username: &str, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            exp: now + self.access_token_ttl_minutes * 60,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Validate the signature and expiry of a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret-that-is-long-enough-for-hmac", 15)
    }

    #[test]
    fn issue_and_validate() {
        let keys = keys();
        let token = keys.issue(42, "alice", Role::Moderator).expect("token generation should succeed");
        let claims = keys.validate(&token).expect("token validation should succeed");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Moderator);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn expired_token_fails() {
        let keys = keys();
        // Well past the default 60 second leeway
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            username: "bob".to_string(),
            role: Role::User,
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.validate(&token).is_err());
    }

    #[test]
    fn different_secrets_fail() {
        let a = JwtKeys::new("secret-alpha", 15);
        let b = JwtKeys::new("secret-bravo", 15);
        let token = a.issue(1, "carol", Role::User).unwrap();
        assert!(b.validate(&token).is_err());
    }
}
