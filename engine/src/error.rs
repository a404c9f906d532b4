//! Engine error types.

use tether_core::RecordError;
use tether_loader::LoaderError;
use tether_mutation::MutationError;
use tether_registry::RegistryError;
use tether_store::StoreError;
use tether_transaction::TransactionError;
use thiserror::Error;

/// Result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Who has to act on a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request was malformed or referenced missing data.
    Client,
    /// The schema, the stored data or the store itself is at fault.
    Server,
}

/// Errors returned by engine calls.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl EngineError {
    /// Classify the failure for the transport layer.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Mutation(e) => match e {
                MutationError::AmbiguousOperation { .. }
                | MutationError::EmptyOperation { .. }
                | MutationError::InvalidOperation { .. }
                | MutationError::InvalidPolymorphicType { .. }
                | MutationError::MissingPolymorphicType { .. }
                | MutationError::UnknownField { .. }
                | MutationError::TargetNotFound { .. }
                | MutationError::SyncTargetNotFound { .. }
                | MutationError::Cancelled => ErrorClass::Client,
                MutationError::UnknownRelation { .. }
                | MutationError::Registry(_)
                | MutationError::Record(_)
                | MutationError::Store(_) => ErrorClass::Server,
            },
            EngineError::Transaction(TransactionError::Cancelled) => ErrorClass::Client,
            _ => ErrorClass::Server,
        }
    }

    /// Check if stored rows contradicted a relation's cardinality.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            EngineError::Loader(e) if matches!(e.root_cause(), LoaderError::DataIntegrity { .. })
        )
    }
}
