//! User account queries.

use chrono::{DateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use preschool_auth_models::{UserRecord, UserRole};
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

fn row_to_user(row: &Row) -> Result<UserRecord, DbError> {
    let email: String = row.to_value("email").unwrap_or_default();
    let role: String = row.to_value("role").unwrap_or_default();
    let role = role.parse::<UserRole>().map_err(|_| DbError::Conversion {
        message: format!("Unknown role '{role}' for user {email}"),
    })?;
    let created_at: String = row.to_value("created_at").unwrap_or_default();
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid created_at '{created_at}' for user {email}: {e}"),
        })?
        .with_timezone(&Utc);

    Ok(UserRecord {
        password_hash: row.to_value("password_hash").unwrap_or_default(),
        role,
        created_at,
        email,
    })
}

/// Stores a new account. Returns `false` if the email is already taken.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn insert_user(db: &dyn Database, user: &UserRecord) -> Result<bool, DbError> {
    let inserted = db
        .exec_raw_params(
            "INSERT OR IGNORE INTO users (email, password_hash, role, created_at)
             VALUES ($1, $2, $3, $4)",
            &[
                DatabaseValue::String(user.email.clone()),
                DatabaseValue::String(user.password_hash.clone()),
                DatabaseValue::String(user.role.as_ref().to_string()),
                DatabaseValue::String(user.created_at.to_rfc3339()),
            ],
        )
        .await?;

    Ok(inserted > 0)
}

/// Looks up an account by its normalized email.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be converted.
pub async fn get_user(db: &dyn Database, email: &str) -> Result<Option<UserRecord>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT email, password_hash, role, created_at FROM users WHERE email = $1",
            &[DatabaseValue::String(email.to_string())],
        )
        .await?;

    rows.first().map(row_to_user).transpose()
}
