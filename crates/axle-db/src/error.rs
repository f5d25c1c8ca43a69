//! # Database Error Types
//!
//! Storage-layer errors. Driver errors (`sqlx::Error`) are converted
//! into these as they cross the repository boundary, with SQLite
//! constraint messages parsed into structured variants so callers can
//! react to *which* constraint fired (e.g. a duplicate invoice number
//! is retryable, a duplicate SKU is not).

use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row lookup by id came back empty.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// UNIQUE constraint violation, parsed down to the column name.
    #[error("Duplicate value for {field}")]
    UniqueViolation { field: String },

    /// FOREIGN KEY constraint violation.
    #[error("Reference integrity violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Could not open or connect to the database.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed for a non-constraint reason.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction begin/commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No pooled connection available within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DbError {
    /// Constructs a `NotFound` with entity context.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Constructs a `UniqueViolation` for a known field.
    pub fn duplicate(field: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
        }
    }
}

/// Extracts the violating column from a SQLite UNIQUE error message.
///
/// SQLite reports `UNIQUE constraint failed: sales.invoice_number`;
/// we keep just `invoice_number`.
fn parse_unique_column(message: &str) -> Option<String> {
    let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
    let first = columns.split(',').next()?.trim();
    Some(first.rsplit('.').next()?.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "record".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if let Some(field) = parse_unique_column(&message) {
                    DbError::UniqueViolation { field }
                } else if message.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation { message }
                } else {
                    DbError::QueryFailed(message)
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Convenience alias for storage operations.
pub type DbResult<T> = Result<T, DbError>;
