//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! sqlx::Error ──► DbError ──► FetchError (scanline-runtime) ──► CacheStatus.error
//!                    │
//!                    └── is_retryable(): Locked / Unavailable
//! ```
//!
//! A refresh that hits a locked or unreachable catalog is worth retrying;
//! schema and constraint problems are not.

use thiserror::Error;

/// Catalog database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A UNIQUE constraint rejected the write. `constraint` is SQLite's
    /// `table.column` list, e.g. `products.store_id, products.sku`.
    #[error("duplicate value for {constraint}")]
    Duplicate { constraint: String },

    /// A barcode row referenced a product that does not exist.
    #[error("unknown product referenced: {0}")]
    MissingProduct(String),

    /// SQLITE_BUSY: a writer held the lock past the busy timeout.
    #[error("catalog database is locked: {0}")]
    Locked(String),

    /// The pool is closed or timed out, or the file could not be opened.
    #[error("catalog database unavailable: {0}")]
    Unavailable(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether trying the same operation again later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Locked(_) | DbError::Unavailable(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("row", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if let Some(constraint) = message.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::Duplicate {
                        constraint: constraint.to_string(),
                    }
                } else if message.contains("FOREIGN KEY constraint failed") {
                    DbError::MissingProduct(message.to_string())
                } else if message.contains("database is locked") || message.contains("busy") {
                    DbError::Locked(message.to_string())
                } else {
                    DbError::Query(message.to_string())
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DbError::Unavailable(err.to_string())
            }
            sqlx::Error::Migrate(migrate) => DbError::Migration(migrate.to_string()),
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_retryable() {
        assert!(DbError::from(sqlx::Error::PoolClosed).is_retryable());
        assert!(DbError::from(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(DbError::Locked("database is locked".into()).is_retryable());
    }

    #[test]
    fn test_schema_errors_are_not_retryable() {
        assert!(!DbError::Query("no such table: products".into()).is_retryable());
        assert!(!DbError::not_found("product", "p-1").is_retryable());
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DbError::not_found("product", "p-1").to_string(),
            "product p-1 not found"
        );
        assert_eq!(
            DbError::Duplicate {
                constraint: "products.store_id, products.sku".into()
            }
            .to_string(),
            "duplicate value for products.store_id, products.sku"
        );
    }
}
