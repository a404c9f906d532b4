//! Transaction boundary for top-level write calls.

use crate::{CancelHandle, TransactionError};
use std::fmt::Display;
use tether_store::{Storage, Transaction};
use tracing::{error, info, warn};

/// Opens, commits and rolls back the store transaction around one call.
///
/// Any error returned by the wrapped call rolls back every write it made.
/// With wrapping disabled the call writes through the store's autocommit
/// handle instead, and a failure leaves earlier writes in place.
pub struct TransactionBoundary<'s, S: Storage + ?Sized> {
    storage: &'s S,
    wrap: bool,
    cancel: Option<CancelHandle>,
}

impl<'s, S: Storage + ?Sized> TransactionBoundary<'s, S> {
    /// Create a boundary that wraps calls in a transaction.
    pub fn new(storage: &'s S) -> Self {
        Self {
            storage,
            wrap: true,
            cancel: None,
        }
    }

    /// Enable or disable transaction wrapping.
    pub fn wrapped(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    /// Abort (and roll back) when `handle` is cancelled before commit.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Check if calls are wrapped in a transaction.
    pub fn is_wrapped(&self) -> bool {
        self.wrap
    }

    /// Run `f` inside one transaction.
    pub fn run<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<TransactionError> + Display,
    {
        self.ensure_not_cancelled()?;
        if !self.wrap {
            return self.run_autocommit(f);
        }

        let mut tx = self.storage.begin().map_err(TransactionError::Begin)?;
        let result = f(&mut *tx).and_then(|value| {
            self.ensure_not_cancelled()?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                tx.commit().map_err(TransactionError::Commit)?;
                info!("transaction committed");
                Ok(value)
            }
            Err(e) => {
                match tx.rollback() {
                    Ok(()) => info!(error = %e, "transaction rolled back"),
                    Err(rollback) => error!(error = %e, %rollback, "rollback failed"),
                }
                Err(e)
            }
        }
    }

    fn run_autocommit<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<TransactionError> + Display,
    {
        let mut tx = self.storage.autocommit().map_err(TransactionError::Begin)?;
        match f(&mut *tx) {
            Ok(value) => {
                tx.commit().map_err(TransactionError::Commit)?;
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, "unwrapped mutation failed, earlier writes were kept");
                // Rollback of an autocommit handle only releases it.
                if let Err(rollback) = tx.rollback() {
                    error!(error = %e, %rollback, "autocommit handle release failed");
                }
                Err(e)
            }
        }
    }

    fn ensure_not_cancelled(&self) -> Result<(), TransactionError> {
        match &self.cancel {
            Some(handle) if handle.is_cancelled() => Err(TransactionError::Cancelled),
            _ => Ok(()),
        }
    }
}
