//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)      tokio::time::error::Elapsed            │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← Adds context and categorization                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DataAccessError (tavola-core) ← What the resolver sees                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TaxError::DataAccess ← Returned from compute()                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tavola_core::DataAccessError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU for a tenant
    /// - Two tax rules for the same tenant, category and effective date
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A query did not finish within the configured timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// A stored row could not be turned into a domain value
    /// (unknown category label, rate above 100%, ...).
    #[error("Malformed {entity} row {id}: {reason}")]
    Malformed {
        entity: String,
        id: String,
        reason: String,
    },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Malformed error for a row that failed domain validation.
    pub fn malformed(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        DbError::Malformed {
            entity: entity.into(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Converts into the store-agnostic error the resolver understands.
    ///
    /// `store` names the table or repository the failure came from.
    pub fn into_data_access(self, store: &str) -> DataAccessError {
        match self {
            DbError::Timeout { timeout_ms, .. } => DataAccessError::timeout(store, timeout_ms),
            err @ DbError::Malformed { .. } => DataAccessError::malformed(store, err.to_string()),
            other => DataAccessError::unavailable(store, other.to_string()),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// sqlx::Error::ColumnDecode   → DbError::Malformed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports "UNIQUE constraint failed: <table>.<col>, <table>.<col>"
                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::duplicate(columns, "unknown")
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => {
                DbError::malformed("column", index, source)
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_data_access_timeout() {
        let err = DbError::Timeout {
            operation: "tax_rules.for_categories",
            timeout_ms: 250,
        };
        assert_eq!(
            err.into_data_access("tax_rules"),
            DataAccessError::timeout("tax_rules", 250)
        );
    }

    #[test]
    fn test_malformed_row_keeps_reason() {
        let err = DbError::malformed("tax_rule", "r-1", "rate_bps 20000 out of range");
        match err.into_data_access("tax_rules") {
            DataAccessError::Malformed { store, message } => {
                assert_eq!(store, "tax_rules");
                assert!(message.contains("r-1"));
                assert!(message.contains("20000"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_are_unavailable() {
        let err = DbError::ConnectionFailed("Pool is closed".into());
        assert!(matches!(
            err.into_data_access("products"),
            DataAccessError::Unavailable { .. }
        ));
    }
}
