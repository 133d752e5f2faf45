//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or soft-deleted note
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Note owned by someone else
    #[error("Access denied to note: {0}")]
    AccessDenied(String),
}
