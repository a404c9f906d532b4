//! Tether Transaction
//!
//! The boundary around one top-level write call.
//!
//! Responsibilities:
//! - Open the store transaction before the executor runs
//! - Commit on success, roll back on any failure
//! - Fall back to autocommit writes when wrapping is disabled
//! - Carry the cancellation flag shared with the caller

mod boundary;
mod cancel;
mod error;

pub use boundary::TransactionBoundary;
pub use cancel::CancelHandle;
pub use error::{TransactionError, TransactionResult};
