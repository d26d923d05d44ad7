#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! User accounts and the request/response bodies of the auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Token type reported in every [`AuthResponse`].
pub const TOKEN_TYPE: &str = "Bearer";

/// Access level of a user account.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum UserRole {
    /// Regular user (parent).
    #[default]
    #[serde(rename = "korisnik")]
    #[strum(serialize = "korisnik")]
    User,
    /// Municipal clerk.
    #[serde(rename = "sluzbenik")]
    #[strum(serialize = "sluzbenik")]
    Clerk,
    /// Administrator.
    #[serde(rename = "admin")]
    #[strum(serialize = "admin")]
    Admin,
}

impl UserRole {
    /// Parses a requested role. A missing or blank role means
    /// [`UserRole::User`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::InvalidRole`] for any other unknown value.
    pub fn normalize(raw: Option<&str>) -> Result<Self, CredentialsError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::User),
            Some(value) => value
                .to_lowercase()
                .parse()
                .map_err(|_| CredentialsError::InvalidRole {
                    value: value.to_string(),
                }),
        }
    }
}

/// Errors produced when validating credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    /// Email or password was empty.
    #[error("email and password are required")]
    MissingCredentials,

    /// The requested role is not one of the known roles.
    #[error("invalid role '{value}' (expected korisnik, sluzbenik or admin)")]
    InvalidRole {
        /// The rejected value.
        value: String,
    },
}

/// Canonical form of an email address: trimmed and lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Normalized email, unique per account.
    pub email: String,
    /// Hex encoded password hash.
    pub password_hash: String,
    /// Access level.
    pub role: UserRole,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// `POST /api/auth/register` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account email.
    #[serde(default)]
    pub email: String,
    /// Plain text password.
    #[serde(default)]
    pub password: String,
    /// Requested role. Defaults to [`UserRole::User`].
    #[serde(default)]
    pub role: Option<String>,
}

/// Validated registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Normalized email.
    pub email: String,
    /// Plain text password.
    pub password: String,
    /// Access level.
    pub role: UserRole,
}

impl RegisterRequest {
    /// Normalizes the email and checks the required fields and role.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError`] if the email or password is empty or
    /// the role is unknown.
    pub fn validate(self) -> Result<NewUser, CredentialsError> {
        let email = normalize_email(&self.email);
        if email.is_empty() || self.password.is_empty() {
            return Err(CredentialsError::MissingCredentials);
        }

        Ok(NewUser {
            email,
            password: self.password,
            role: UserRole::normalize(self.role.as_deref())?,
        })
    }
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email, matched after normalization.
    #[serde(default)]
    pub email: String,
    /// Plain text password.
    #[serde(default)]
    pub password: String,
}

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed bearer token.
    pub access_token: String,
    /// Always [`TOKEN_TYPE`].
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    /// Account email.
    pub email: String,
    /// Account role.
    pub role: UserRole,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// Account email.
    pub email: String,
    /// Account role.
    pub role: UserRole,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for ProfileResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}
