//! Tether Store
//!
//! The storage adapter boundary consumed by the relationship engine.
//!
//! Responsibilities:
//! - Define the adapter traits (`Reader`, `Transaction`, `Storage`)
//! - Define the structured query model (filter-by-key-set, pivot joins)
//! - Provide `MemoryStore`, an in-memory adapter with an undo log per
//!   transaction and a statement log for inspection
//!
//! # Module Structure
//!
//! - `adapter` - Adapter traits
//! - `query` - Query, Filter, PivotJoin and Row types
//! - `memory` - In-memory reference adapter
//! - `log` - Statement log entries
//! - `error` - Error types for storage failures

mod adapter;
mod error;
mod log;
mod memory;
mod query;

pub use adapter::{Reader, Storage, Transaction};
pub use error::{StoreError, StoreResult};
pub use log::{Statement, StatementKind};
pub use memory::{MemoryStore, MemoryTransaction};
pub use query::{Filter, PivotJoin, Query, Row};
