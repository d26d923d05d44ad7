#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Password hashing and HS256 bearer tokens for the preschool service.
//!
//! Passwords are stored as `hex(sha256(email:password:salt))`. Tokens carry
//! the account email as `sub` and its [`UserRole`], and are only accepted
//! with this service's issuer and audience.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use preschool_auth_models::{UserRecord, UserRole};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// `iss` claim of every issued token.
pub const ISSUER: &str = "preschool-service";

/// `aud` claim of every issued token.
pub const AUDIENCE: &str = "frontend";

/// Token lifetime when none is configured.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Errors raised while authenticating a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("missing Authorization header")]
    MissingHeader,

    /// The header did not carry a bearer token.
    #[error("expected a Bearer token")]
    MalformedHeader,

    /// The token failed signature or claim validation.
    #[error("invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    /// Account role.
    pub role: UserRole,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Always [`ISSUER`].
    pub iss: String,
    /// Always [`AUDIENCE`].
    pub aud: String,
    /// Unique token id.
    pub jti: String,
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// The token's claims.
    pub claims: Claims,
}

/// Hashes passwords and signs and verifies access tokens with one shared
/// secret.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    salt: String,
    ttl: Duration,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator signing with `secret` and hashing passwords
    /// with `salt`.
    #[must_use]
    pub fn new(secret: &str, salt: impl Into<String>, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            salt: salt.into(),
            ttl,
        }
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Salted SHA-256 of the credentials, hex encoded.
    #[must_use]
    pub fn hash_password(&self, email: &str, password: &str) -> String {
        let digest = Sha256::digest(format!("{email}:{password}:{}", self.salt).as_bytes());
        hex::encode(digest)
    }

    /// Whether `password` matches the stored hash of `user`.
    #[must_use]
    pub fn verify_password(&self, user: &UserRecord, password: &str) -> bool {
        self.hash_password(&user.email, password) == user.password_hash
    }

    /// Signs a token for `email` with `role`, valid for the configured
    /// lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if encoding fails.
    pub fn issue_token(&self, email: &str, role: UserRole) -> Result<IssuedToken, AuthError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: email.to_string(),
            role,
            exp: chrono::Utc::now().timestamp().saturating_add(ttl),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        log::debug!("Issued token {} for {email}", claims.jti);

        Ok(IssuedToken { token, claims })
    }

    /// Checks the signature, expiry, issuer, and audience of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if any check fails.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedHeader`] unless the value is `Bearer`
/// followed by a non-empty token.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}
