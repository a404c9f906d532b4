//! Loader error types.

use tether_core::RecordError;
use tether_registry::RegistryError;
use tether_store::StoreError;
use thiserror::Error;

/// Result type for read-path operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors that can occur while loading relations.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Unknown relation {relation} on {entity_type}")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("Data integrity error: relation {relation} found {count} rows for key {key}")]
    DataIntegrity {
        relation: String,
        key: String,
        count: usize,
    },

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to start load pool: {0}")]
    Pool(String),

    #[error("Failed to resolve {path}: {source}")]
    Branch {
        path: String,
        #[source]
        source: Box<LoaderError>,
    },
}

impl LoaderError {
    pub fn unknown_relation(entity_type: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            entity_type: entity_type.into(),
            relation: relation.into(),
        }
    }

    pub fn data_integrity(relation: impl Into<String>, key: impl ToString, count: usize) -> Self {
        Self::DataIntegrity {
            relation: relation.into(),
            key: key.to_string(),
            count,
        }
    }

    /// Attach the selection path of the failing branch.
    pub fn branch(path: impl Into<String>, source: LoaderError) -> Self {
        match source {
            already @ LoaderError::Branch { .. } => already,
            source => Self::Branch {
                path: path.into(),
                source: Box::new(source),
            },
        }
    }

    /// The underlying error, without branch context.
    pub fn root_cause(&self) -> &LoaderError {
        match self {
            LoaderError::Branch { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<RegistryError> for LoaderError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownRelation {
                entity_type,
                relation,
            } => Self::UnknownRelation {
                entity_type,
                relation,
            },
            other => Self::Registry(other),
        }
    }
}
