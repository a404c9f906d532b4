//! Storage adapter traits.

use crate::{Filter, Query, Row, StoreResult};
use tether_core::{Fields, Key};

/// Read access to stored rows.
pub trait Reader {
    /// Run one query and return the matching rows.
    fn query(&self, query: &Query) -> StoreResult<Vec<Row>>;
}

/// A unit of work against the store.
///
/// Writes made through a transaction are visible to its own reads.
/// Dropping a transaction without committing rolls it back.
pub trait Transaction: Reader {
    /// Insert a row (when `key` is None) or update the row with `key`.
    /// Returns the row's primary key.
    fn execute_write(&mut self, table: &str, fields: Fields, key: Option<&Key>)
        -> StoreResult<Key>;

    /// Delete every row matching `filter`, returning the number removed.
    fn delete(&mut self, table: &str, filter: &Filter) -> StoreResult<usize>;

    /// Make all writes permanent.
    fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard all writes.
    fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// A store that can be read concurrently and written transactionally.
pub trait Storage: Reader + Send + Sync {
    /// Open a transaction.
    fn begin(&self) -> StoreResult<Box<dyn Transaction + '_>>;

    /// Open a write handle whose writes apply immediately; rollback is a no-op.
    fn autocommit(&self) -> StoreResult<Box<dyn Transaction + '_>>;
}
