//! Database connection and schema setup.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

use crate::DbError;
use crate::paths::ensure_parent_dir;

/// Opens (or creates) the record store at `path` and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory cannot be created, the
/// database cannot be opened, or schema creation fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    ensure_parent_dir(path)?;

    log::info!("Opening record store at {}", path.display());
    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Database(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Creates the kindergartens and users tables if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS kindergartens (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            kind          TEXT NOT NULL,
            city          TEXT NOT NULL DEFAULT '',
            municipality  TEXT NOT NULL DEFAULT '',
            max_capacity  INTEGER NOT NULL,
            enrolled      INTEGER NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_kindergartens_municipality
         ON kindergartens (municipality)",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS users (
            email          TEXT PRIMARY KEY,
            password_hash  TEXT NOT NULL,
            role           TEXT NOT NULL,
            created_at     TEXT NOT NULL
        )",
    )
    .await?;

    Ok(())
}
