//! Error types for response sink operations.

use std::fmt;

use thiserror::Error;

/// Structured classification for sink failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// `SQLite` returned busy/locked under concurrent access.
    BusyOrLocked,
    /// Constraint failure (check/not-null).
    ConstraintViolation,
    /// Connection pool timed out waiting for a free connection.
    PoolTimeout,
    /// Connection pool is closed.
    PoolClosed,
    /// Filesystem or transport IO failure.
    Io,
    /// Unclassified database failure.
    Other,
}

impl StoreErrorKind {
    /// Classifies a sqlx error.
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::Io(_) => Self::Io,
            sqlx::Error::Database(database_error) => {
                classify_database_error(database_error.as_ref())
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::PoolTimeout => "pool_timeout",
            Self::PoolClosed => "pool_closed",
            Self::Io => "io",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

fn classify_database_error(
    database_error: &(dyn sqlx::error::DatabaseError + 'static),
) -> StoreErrorKind {
    let code = database_error.code();
    if matches!(
        code.as_deref(),
        Some("SQLITE_BUSY" | "SQLITE_LOCKED" | "5" | "6")
    ) {
        return StoreErrorKind::BusyOrLocked;
    }

    if database_error.is_check_violation()
        || code
            .as_deref()
            .is_some_and(|value| value.starts_with("SQLITE_CONSTRAINT") || value.starts_with("275"))
    {
        return StoreErrorKind::ConstraintViolation;
    }

    let message = database_error.message().to_ascii_lowercase();
    if message.contains("database is locked") || message.contains("database is busy") {
        return StoreErrorKind::BusyOrLocked;
    }
    if message.contains("constraint failed") {
        return StoreErrorKind::ConstraintViolation;
    }

    StoreErrorKind::Other
}

/// Errors from the response sink. All of them are fatal to a harvest run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("sink {operation} failed ({kind}): {source}")]
    Database {
        /// What the sink was doing.
        operation: &'static str,
        /// Typed classification.
        kind: StoreErrorKind,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Wraps a sqlx error with the sink operation that produced it.
    #[must_use]
    pub fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database {
            operation,
            kind: StoreErrorKind::from_sqlx(&source),
            source,
        }
    }

    /// Returns the typed failure class.
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::Database { kind, .. } => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_names_operation() {
        let err = StoreError::database("commit", sqlx::Error::PoolClosed);
        let msg = err.to_string();
        assert!(msg.contains("commit"), "Expected operation in: {msg}");
        assert!(msg.contains("pool_closed"), "Expected kind in: {msg}");
        assert_eq!(err.kind(), StoreErrorKind::PoolClosed);
    }

    #[test]
    fn test_store_error_kind_pool_timeout() {
        assert_eq!(
            StoreErrorKind::from_sqlx(&sqlx::Error::PoolTimedOut),
            StoreErrorKind::PoolTimeout
        );
    }

    #[test]
    fn test_store_error_kind_unclassified() {
        assert_eq!(
            StoreErrorKind::from_sqlx(&sqlx::Error::RowNotFound),
            StoreErrorKind::Other
        );
    }
}
