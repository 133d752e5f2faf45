//! Error type for the record store boundary

use thiserror::Error;

/// Record store errors
///
/// `NotFound` and `AccessDenied` are passed through to callers unchanged;
/// nothing in the read or write path retries them.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Access denied to {entity} {id}")]
    AccessDenied { entity: &'static str, id: String },

    /// A coalesced rebuild failed; the original error went to its first waiter
    #[error("Query rebuild failed: {0}")]
    Rebuild(String),
}

impl DataError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn access_denied(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AccessDenied {
            entity,
            id: id.into(),
        }
    }
}

impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        use crate::data::sqlite::SqliteError;
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                backend: "sqlite",
                version,
                name,
                error,
            },
            SqliteError::Io(e) => Self::Io(e),
            SqliteError::NotFound(id) => Self::not_found("note", id),
            SqliteError::AccessDenied(id) => Self::access_denied("note", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteError;

    #[test]
    fn test_not_found_display() {
        let err = DataError::not_found("note", "n1");
        assert_eq!(err.to_string(), "note not found: n1");
    }

    #[test]
    fn test_from_sqlite_ownership_errors() {
        let err: DataError = SqliteError::AccessDenied("n1".into()).into();
        assert!(matches!(err, DataError::AccessDenied { entity: "note", .. }));

        let err: DataError = SqliteError::NotFound("n2".into()).into();
        assert!(matches!(err, DataError::NotFound { ref id, .. } if id == "n2"));
    }

    #[test]
    fn test_migration_failed_display() {
        let err: DataError = SqliteError::MigrationFailed {
            version: 2,
            name: "add_language_index".into(),
            error: "syntax error".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_language_index) failed on sqlite: syntax error"
        );
    }
}
