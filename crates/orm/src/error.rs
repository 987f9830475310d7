//! Error types for the ORM
//!
//! One crate-wide error enum covering database access, migrations,
//! transactions, and query building. Validation and consistency
//! failures carry enough context (migration name, column, offending
//! type) for operator diagnosis; nothing is retried internally.

use thiserror::Error;

/// Result type alias for ORM operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for ORM operations
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Database connection or statement execution error
    #[error("Database error: {0}")]
    Database(String),

    /// Connection setup or pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction begin, commit, or rollback failure
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Migration-scoped failure (execution, recording)
    #[error("Migration error: {0}")]
    Migration(String),

    /// A column type outside the configured allow-list
    #[error("Invalid column type {sql_type:?} for column {column:?} in migration {migration:?}")]
    InvalidColumnType {
        migration: String,
        column: String,
        sql_type: String,
    },

    /// The ledger references a migration the catalog does not know
    #[error("Migration {0:?} is recorded in the ledger but not registered")]
    MigrationNotFound(String),

    /// Query building or execution error
    #[error("Query error: {0}")]
    Query(String),

    /// CRUD operation on a model that declares no primary key
    #[error("Model for table {0:?} has no primary key")]
    MissingPrimaryKey(String),
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        OrmError::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OrmError {
    fn from(err: anyhow::Error) -> Self {
        OrmError::Database(err.to_string())
    }
}
