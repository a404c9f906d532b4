//! Statement log entries.

use tether_core::{Fields, Key};

/// Kind of statement issued against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Insert,
    Update,
    Delete,
}

/// One statement issued against the store, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement kind.
    pub kind: StatementKind,
    /// Target table (the pivot table for joined queries).
    pub table: String,
    /// Key written (inserts and updates).
    pub key: Option<Key>,
    /// Fields written (inserts and updates).
    pub fields: Fields,
}

impl Statement {
    pub fn query(table: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Query,
            table: table.into(),
            key: None,
            fields: Fields::new(),
        }
    }

    pub fn write(kind: StatementKind, table: impl Into<String>, key: Key, fields: Fields) -> Self {
        Self {
            kind,
            table: table.into(),
            key: Some(key),
            fields,
        }
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Delete,
            table: table.into(),
            key: None,
            fields: Fields::new(),
        }
    }

    /// Returns true for inserts, updates and deletes.
    pub fn is_write(&self) -> bool {
        self.kind != StatementKind::Query
    }
}
