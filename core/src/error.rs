//! Common error types for Tether.

use thiserror::Error;

/// Errors raised while turning stored rows into records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The row has no usable primary key value.
    #[error("Row of {entity_type} has no usable key in column {column}")]
    MissingKey { entity_type: String, column: String },
}

impl RecordError {
    pub fn missing_key(entity_type: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingKey {
            entity_type: entity_type.into(),
            column: column.into(),
        }
    }
}

/// Result type for record construction.
pub type RecordResult<T> = Result<T, RecordError>;
