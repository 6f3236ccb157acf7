//! Store error types.

use thiserror::Error;

/// Errors that can occur when interacting with the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A single row expected to exist was absent.
    #[error("{entity} not found: {id}")]
    RowNotFound { entity: &'static str, id: i64 },

    /// The store refused or failed the operation (also used by the
    /// in-memory implementation's failure injection).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
