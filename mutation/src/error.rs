//! Mutation error types.

use tether_core::{Key, RecordError};
use tether_registry::RegistryError;
use tether_store::StoreError;
use thiserror::Error;

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors that can occur during mutation execution.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Ambiguous operations on {relation}: {operations}")]
    AmbiguousOperation { relation: String, operations: String },

    #[error("No operation given for relation {relation}")]
    EmptyOperation { relation: String },

    #[error("Operation {operation} is not allowed on relation {relation}")]
    InvalidOperation { relation: String, operation: String },

    #[error("Type {type_tag} is not a declared target of polymorphic relation {relation}")]
    InvalidPolymorphicType { relation: String, type_tag: String },

    #[error("Polymorphic relation {relation} needs a target type")]
    MissingPolymorphicType { relation: String },

    #[error("Unknown field: {field} on type {entity_type}")]
    UnknownField { entity_type: String, field: String },

    #[error("Unknown relation {relation} on {entity_type}")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("{entity_type} {key} not found")]
    TargetNotFound { entity_type: String, key: Key },

    #[error("Sync on {relation} references missing keys: {keys}")]
    SyncTargetNotFound { relation: String, keys: String },

    #[error("Mutation cancelled")]
    Cancelled,

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MutationError {
    pub fn ambiguous_operation(relation: impl Into<String>, operations: impl Into<String>) -> Self {
        Self::AmbiguousOperation {
            relation: relation.into(),
            operations: operations.into(),
        }
    }

    pub fn empty_operation(relation: impl Into<String>) -> Self {
        Self::EmptyOperation {
            relation: relation.into(),
        }
    }

    pub fn invalid_operation(relation: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::InvalidOperation {
            relation: relation.into(),
            operation: operation.into(),
        }
    }

    pub fn missing_polymorphic_type(relation: impl Into<String>) -> Self {
        Self::MissingPolymorphicType {
            relation: relation.into(),
        }
    }

    pub fn unknown_field(entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity_type: entity_type.into(),
            field: field.into(),
        }
    }

    pub fn target_not_found(entity_type: impl Into<String>, key: Key) -> Self {
        Self::TargetNotFound {
            entity_type: entity_type.into(),
            key,
        }
    }

    pub fn sync_target_not_found(relation: impl Into<String>, keys: &[Key]) -> Self {
        let keys: Vec<String> = keys.iter().map(Key::to_string).collect();
        Self::SyncTargetNotFound {
            relation: relation.into(),
            keys: keys.join(", "),
        }
    }
}

impl From<RegistryError> for MutationError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownRelation {
                entity_type,
                relation,
            } => Self::UnknownRelation {
                entity_type,
                relation,
            },
            RegistryError::InvalidPolymorphicType { relation, type_tag } => {
                Self::InvalidPolymorphicType { relation, type_tag }
            }
            other => Self::Registry(other),
        }
    }
}
