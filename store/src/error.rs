//! Storage error types.

use tether_core::Key;
use thiserror::Error;

/// Errors reported by a storage adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Row {key} not found in {table}")]
    RowNotFound { table: String, key: Key },

    #[error("Duplicate key {key} in {table}")]
    DuplicateKey { table: String, key: Key },

    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn row_not_found(table: impl Into<String>, key: Key) -> Self {
        Self::RowNotFound {
            table: table.into(),
            key,
        }
    }

    pub fn duplicate_key(table: impl Into<String>, key: Key) -> Self {
        Self::DuplicateKey {
            table: table.into(),
            key,
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
