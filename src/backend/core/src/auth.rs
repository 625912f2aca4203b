//! Authentication: JWT issue/verify and password hashing.
//!
//! This layer sits upstream of the policy engine: it turns request
//! credentials into a [`Principal`] and is never called by the engine
//! itself. Tokens carry the user id and role; roles are fixed at
//! registration.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{BoardError, ErrorCode};
use crate::model::{Role, User, UserId};
use crate::policy::Principal;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl From<AuthError> for BoardError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidToken => {
                BoardError::new(ErrorCode::InvalidToken, "The provided token is invalid")
            }
            AuthError::TokenExpired => {
                BoardError::new(ErrorCode::TokenExpired, "The authentication token has expired")
            }
            AuthError::InvalidCredentials => {
                BoardError::new(ErrorCode::InvalidCredentials, "Invalid username or password")
            }
            AuthError::Internal(msg) => BoardError::internal(msg),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Claims
// ═══════════════════════════════════════════════════════════════════════════════

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: Uuid,

    /// The user's role, fixed at registration.
    pub role: Role,

    /// Token id.
    #[serde(default = "generate_jti")]
    pub jti: String,

    /// Issued at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

fn generate_jti() -> String {
    Uuid::new_v4().to_string()
}

impl Claims {
    pub fn new(user_id: UserId, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.0,
            role,
            jti: generate_jti(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::authenticated(UserId(self.sub), self.role)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Token service
// ═══════════════════════════════════════════════════════════════════════════════

/// Issues and verifies bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims::new(user.id, user.role, self.ttl);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Passwords
// ═══════════════════════════════════════════════════════════════════════════════

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(e.to_string()))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: UserId::new(),
            username: "kofi".into(),
            email: "kofi@example.com".into(),
            role,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let service = TokenService::new("test-secret", Duration::hours(1));
        let u = user(Role::Employer);
        let token = service.issue(&u).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, u.id.0);
        assert_eq!(claims.role, Role::Employer);
        assert_eq!(claims.principal(), Principal::authenticated(u.id, Role::Employer));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenService::new("secret-a", Duration::hours(1));
        let verifier = TokenService::new("secret-b", Duration::hours(1));
        let token = issuer.issue(&user(Role::JobSeeker)).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService::new("test-secret", Duration::seconds(-120));
        let token = service.issue(&user(Role::JobSeeker)).unwrap();
        assert!(matches!(service.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = TokenService::new("test-secret", Duration::hours(1));
        assert!(matches!(
            service.verify("not-a-token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }
}
