//! Event store error types
//!
//! SQLx failures are classified by PostgreSQL error code and then folded
//! into [`PortError`] at the port boundary.

use core_kernel::PortError;
use thiserror::Error;

/// PostgreSQL `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Errors raised by the store adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Transaction could not be started or committed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored column could not be decoded
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl StoreError {
    /// Checks if this error is a unique violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateEntry(_))
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(self, StoreError::ConnectionFailed(_) | StoreError::PoolExhausted)
    }
}

impl From<&sqlx::Error> for StoreError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::Io(e) => StoreError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => StoreError::DuplicateEntry(db_err.message().to_string()),
                Some("23514") => StoreError::ConstraintViolation(db_err.message().to_string()),
                _ => StoreError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::CorruptRow(error.to_string())
            }
            _ => StoreError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::from(&error)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(error.to_string())
    }
}

impl From<StoreError> for PortError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ConnectionFailed(_) | StoreError::PoolExhausted => PortError::Connection {
                message: error.to_string(),
                source: Some(Box::new(error)),
            },
            StoreError::CorruptRow(message) => PortError::serialization(message),
            other => PortError::Internal {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
