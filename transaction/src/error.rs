//! Transaction error types.

use tether_store::StoreError;
use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The store could not open a transaction.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] StoreError),

    /// The store refused the commit; its writes were discarded.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] StoreError),

    /// The call was cancelled before it finished.
    #[error("transaction cancelled")]
    Cancelled,
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
