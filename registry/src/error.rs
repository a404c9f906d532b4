//! Registry error types.

use thiserror::Error;

/// Errors raised while building or consulting the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate entity type: {0}")]
    DuplicateEntity(String),

    #[error("Duplicate relation {relation} on {entity_type}")]
    DuplicateRelation {
        entity_type: String,
        relation: String,
    },

    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Unknown relation {relation} on {entity_type}")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("Relation {relation} references unknown column {column} on {entity_type}")]
    UnknownColumn {
        relation: String,
        entity_type: String,
        column: String,
    },

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Relation {relation} must declare its foreign key column")]
    MissingForeignKey { relation: String },

    #[error("Many-to-many relation {relation} has no pivot table")]
    MissingPivot { relation: String },

    #[error("Polymorphic relation {relation} has no type discriminator")]
    MissingMorph { relation: String },

    #[error("Relation {relation} declares unknown inverse {inverse}")]
    UnknownInverse { relation: String, inverse: String },

    #[error("Relation {relation} and inverse {inverse} have incompatible kinds")]
    InverseMismatch { relation: String, inverse: String },

    #[error("Relation {relation} and inverse {inverse} both own the foreign key")]
    ConflictingOwnership { relation: String, inverse: String },

    #[error("Type {type_tag} is not a declared target of polymorphic relation {relation}")]
    InvalidPolymorphicType { relation: String, type_tag: String },

    #[error("Identifier pattern error: {0}")]
    Pattern(String),
}

impl RegistryError {
    pub fn duplicate_relation(entity_type: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::DuplicateRelation {
            entity_type: entity_type.into(),
            relation: relation.into(),
        }
    }

    pub fn unknown_relation(entity_type: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            entity_type: entity_type.into(),
            relation: relation.into(),
        }
    }

    pub fn unknown_column(
        relation: impl Into<String>,
        entity_type: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::UnknownColumn {
            relation: relation.into(),
            entity_type: entity_type.into(),
            column: column.into(),
        }
    }

    pub fn unknown_inverse(relation: impl Into<String>, inverse: impl Into<String>) -> Self {
        Self::UnknownInverse {
            relation: relation.into(),
            inverse: inverse.into(),
        }
    }

    pub fn inverse_mismatch(relation: impl Into<String>, inverse: impl Into<String>) -> Self {
        Self::InverseMismatch {
            relation: relation.into(),
            inverse: inverse.into(),
        }
    }

    pub fn conflicting_ownership(relation: impl Into<String>, inverse: impl Into<String>) -> Self {
        Self::ConflictingOwnership {
            relation: relation.into(),
            inverse: inverse.into(),
        }
    }

    pub fn invalid_polymorphic_type(
        relation: impl Into<String>,
        type_tag: impl Into<String>,
    ) -> Self {
        Self::InvalidPolymorphicType {
            relation: relation.into(),
            type_tag: type_tag.into(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
