//! # Database Error Types
//!
//! Error types for database operations and the sale engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (tillbook-core)         │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────── DbError::Domain                        │
//! │       │                                                                 │
//! │       ├── is_retryable()? ──► SaleEngine retries the whole operation   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  user_message() ──► shown by the caller                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error inside an engine operation drops its transaction, which rolls
//! back every write made so far.

use thiserror::Error;
use tillbook_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate SKU within a branch
    /// - Two writers allocating the same sale number
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Sale pointing at a cash account that does not exist
    /// - History row for a product that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Another connection holds the SQLite write lock.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Gave up after retrying a contended write.
    #[error("Operation conflicted with concurrent writes after {attempts} attempts")]
    Conflict { attempts: u32 },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

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

    /// Whether running the same operation again, in a fresh transaction,
    /// can succeed.
    ///
    /// ```text
    /// Busy                                 → yes (lock released later)
    /// UniqueViolation on sales.sale_number → yes (allocate the next number)
    /// everything else                      → no
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::Busy(_) => true,
            DbError::UniqueViolation { field, .. } => field == "sales.sale_number",
            _ => false,
        }
    }

    /// Human-readable reason for the caller to display.
    pub fn user_message(&self) -> String {
        match self {
            DbError::Domain(err) => err.to_string(),
            DbError::NotFound { entity, .. } => format!("{} was not found", entity),
            DbError::UniqueViolation { field, .. } => {
                format!("A record with the same {} already exists", field)
            }
            DbError::ForeignKeyViolation { .. } => {
                "The record refers to something that does not exist".to_string()
            }
            DbError::Busy(_) | DbError::Conflict { .. } | DbError::PoolExhausted => {
                "The database is busy, please try again".to_string()
            }
            _ => "An unexpected database error occurred".to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → UNIQUE / FOREIGN KEY / busy / other
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database table is locked") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

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

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::PaymentStatus;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(DbError::duplicate("sales.sale_number", "SAL-2026-001").is_retryable());

        assert!(!DbError::duplicate("products.branch_id, products.sku", "X").is_retryable());
        assert!(!DbError::not_found("Sale", "1").is_retryable());
        assert!(!DbError::Conflict { attempts: 3 }.is_retryable());
    }

    #[test]
    fn test_domain_errors_keep_their_message() {
        let err: DbError = CoreError::InvalidStatusTransition {
            from: PaymentStatus::Paid,
            to: PaymentStatus::Quote,
        }
        .into();

        assert_eq!(err.to_string(), "Cannot change payment status from PAID to QUOTE");
        assert_eq!(err.user_message(), "Cannot change payment status from PAID to QUOTE");
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = DbError::QueryFailed("no such column: foo".into());
        assert_eq!(err.user_message(), "An unexpected database error occurred");
    }
}
