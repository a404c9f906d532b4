//! In-memory storage adapter.
//!
//! Rows live in insertion-ordered tables. A transaction holds the table lock
//! for its whole lifetime (single-writer model), applies writes directly and
//! tracks them in an undo log for rollback.

use crate::{
    Filter, PivotJoin, Query, Reader, Row, Statement, StatementKind, Storage, StoreError,
    StoreResult, Transaction,
};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use tether_core::{Fields, Key, Value};
use tracing::debug;

/// One stored table.
#[derive(Debug, Default)]
struct Table {
    /// Primary key column; pivot tables have none.
    primary_key: Option<String>,
    /// Rows with their internal row ids, in insertion order.
    rows: Vec<(u64, Fields)>,
    /// Next auto-increment key.
    next_key: i64,
}

impl Table {
    fn position_of(&self, key: &Key) -> Option<usize> {
        let pk = self.primary_key.as_deref()?;
        let value = key.to_value();
        self.rows
            .iter()
            .position(|(_, fields)| fields.get(pk) == Some(&value))
    }
}

/// All tables plus the row id allocator.
#[derive(Debug, Default)]
struct Tables {
    tables: HashMap<String, Table>,
    next_row_id: u64,
}

impl Tables {
    fn get(&self, name: &str) -> StoreResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn select(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let table = self.get(&query.table)?;
        let mut rows: Vec<Row> = match &query.join {
            None => table
                .rows
                .iter()
                .filter(|(_, fields)| query.filter.matches(fields))
                .map(|(_, fields)| Row::new(fields.clone()))
                .collect(),
            Some(join) => self.select_joined(table, &query.filter, join)?,
        };

        if let Some(column) = &query.order_by {
            rows.sort_by(|a, b| {
                sort_value(&a.fields, column).cmp_sortable(sort_value(&b.fields, column))
            });
        }
        Ok(rows)
    }

    fn select_joined(
        &self,
        table: &Table,
        filter: &Filter,
        join: &PivotJoin,
    ) -> StoreResult<Vec<Row>> {
        let pivot = self.get(&join.table)?;
        let mut pivot_rows: Vec<&Fields> = pivot
            .rows
            .iter()
            .map(|(_, fields)| fields)
            .filter(|fields| join.filter.matches(fields))
            .collect();
        if let Some(column) = &join.order_column {
            pivot_rows.sort_by(|a, b| sort_value(a, column).cmp_sortable(sort_value(b, column)));
        }

        let mut rows = Vec::new();
        for pivot_row in pivot_rows {
            let Some(link) = pivot_row.get(&join.related_column) else {
                continue;
            };
            for (_, fields) in &table.rows {
                if fields.get(&join.target_column) == Some(link) && filter.matches(fields) {
                    rows.push(Row {
                        fields: fields.clone(),
                        pivot: Some(pivot_row.clone()),
                    });
                }
            }
        }
        Ok(rows)
    }
}

fn sort_value<'f>(fields: &'f Fields, column: &str) -> &'f Value {
    const NULL: &Value = &Value::Null;
    fields.get(column).unwrap_or(NULL)
}

/// A reversible change recorded by a transaction.
#[derive(Debug)]
enum Undo {
    Inserted { table: String, row_id: u64 },
    Updated { table: String, row_id: u64, previous: Fields },
    Deleted { table: String, position: usize, row_id: u64, fields: Fields },
}

/// The in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    log: Mutex<Vec<Statement>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table whose rows are keyed by `primary_key`.
    pub fn with_table(self, name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        self.tables.lock().tables.insert(
            name.into(),
            Table {
                primary_key: Some(primary_key.into()),
                rows: Vec::new(),
                next_key: 1,
            },
        );
        self
    }

    /// Create a keyless table (pivot tables).
    pub fn with_pivot_table(self, name: impl Into<String>) -> Self {
        self.tables.lock().tables.insert(name.into(), Table::default());
        self
    }

    /// Insert a row outside any transaction, without logging it.
    pub fn seed(&self, table: &str, fields: Fields) -> StoreResult<Key> {
        let mut tables = self.tables.lock();
        insert_row(&mut tables, table, fields).map(|(key, _)| key)
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> StoreResult<Vec<Fields>> {
        let tables = self.tables.lock();
        Ok(tables.get(table)?.rows.iter().map(|(_, f)| f.clone()).collect())
    }

    /// Look up one row by primary key.
    pub fn find(&self, table: &str, key: &Key) -> StoreResult<Option<Fields>> {
        let tables = self.tables.lock();
        let table = tables.get(table)?;
        Ok(table.position_of(key).map(|i| table.rows[i].1.clone()))
    }

    // ==================== Statement Log ====================

    /// All statements issued so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().clone()
    }

    /// Number of queries issued against `table` (pivot table for joins).
    pub fn queries_on(&self, table: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|s| s.kind == StatementKind::Query && s.table == table)
            .count()
    }

    /// Total number of queries issued.
    pub fn query_count(&self) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|s| s.kind == StatementKind::Query)
            .count()
    }

    /// Write statements issued against `table`, in order.
    pub fn writes_on(&self, table: &str) -> Vec<Statement> {
        self.log
            .lock()
            .iter()
            .filter(|s| s.is_write() && s.table == table)
            .cloned()
            .collect()
    }

    /// Forget all logged statements.
    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn record(&self, statement: Statement) {
        self.log.lock().push(statement);
    }

    fn open(&self, autocommit: bool) -> MemoryTransaction<'_> {
        MemoryTransaction {
            store: self,
            tables: self.tables.lock(),
            undo: Vec::new(),
            autocommit,
            finished: false,
        }
    }
}

fn insert_row(tables: &mut Tables, name: &str, mut fields: Fields) -> StoreResult<(Key, u64)> {
    let row_id = tables.next_row_id;
    let table = tables.get_mut(name)?;

    let key = match table.primary_key.clone() {
        Some(pk) => {
            let explicit = fields.get(&pk).and_then(Key::from_value);
            let key = match explicit {
                Some(key) => {
                    if table.position_of(&key).is_some() {
                        return Err(StoreError::duplicate_key(name, key));
                    }
                    if let Key::Int(i) = key {
                        table.next_key = table.next_key.max(i + 1);
                    }
                    key
                }
                None => {
                    let key = Key::Int(table.next_key);
                    table.next_key += 1;
                    key
                }
            };
            fields.insert(pk, key.to_value());
            key
        }
        None => Key::Int(row_id as i64),
    };

    table.rows.push((row_id, fields));
    tables.next_row_id += 1;
    Ok((key, row_id))
}

impl Reader for MemoryStore {
    fn query(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let rows = self.tables.lock().select(query)?;
        self.record(Statement::query(logged_table(query)));
        Ok(rows)
    }
}

impl Storage for MemoryStore {
    fn begin(&self) -> StoreResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(self.open(false)))
    }

    fn autocommit(&self) -> StoreResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(self.open(true)))
    }
}

fn logged_table(query: &Query) -> &str {
    query
        .join
        .as_ref()
        .map(|j| j.table.as_str())
        .unwrap_or(&query.table)
}

/// A transaction (or autocommit handle) on a MemoryStore.
pub struct MemoryTransaction<'s> {
    store: &'s MemoryStore,
    tables: MutexGuard<'s, Tables>,
    undo: Vec<Undo>,
    autocommit: bool,
    finished: bool,
}

impl MemoryTransaction<'_> {
    /// Undo every recorded change, newest first.
    fn undo_all(&mut self) {
        while let Some(change) = self.undo.pop() {
            match change {
                Undo::Inserted { table, row_id } => {
                    if let Ok(t) = self.tables.get_mut(&table) {
                        t.rows.retain(|(id, _)| *id != row_id);
                    }
                }
                Undo::Updated {
                    table,
                    row_id,
                    previous,
                } => {
                    if let Ok(t) = self.tables.get_mut(&table) {
                        if let Some(row) = t.rows.iter_mut().find(|(id, _)| *id == row_id) {
                            row.1 = previous;
                        }
                    }
                }
                Undo::Deleted {
                    table,
                    position,
                    row_id,
                    fields,
                } => {
                    if let Ok(t) = self.tables.get_mut(&table) {
                        let position = position.min(t.rows.len());
                        t.rows.insert(position, (row_id, fields));
                    }
                }
            }
        }
    }
}

impl Reader for MemoryTransaction<'_> {
    fn query(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let rows = self.tables.select(query)?;
        self.store.record(Statement::query(logged_table(query)));
        Ok(rows)
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn execute_write(
        &mut self,
        table: &str,
        fields: Fields,
        key: Option<&Key>,
    ) -> StoreResult<Key> {
        match key {
            None => {
                let (key, row_id) = insert_row(&mut self.tables, table, fields.clone())?;
                if !self.autocommit {
                    self.undo.push(Undo::Inserted {
                        table: table.to_string(),
                        row_id,
                    });
                }
                debug!(table, %key, "insert");
                self.store
                    .record(Statement::write(StatementKind::Insert, table, key.clone(), fields));
                Ok(key)
            }
            Some(key) => {
                let t = self.tables.get_mut(table)?;
                if t.primary_key.is_none() {
                    return Err(StoreError::NoPrimaryKey(table.to_string()));
                }
                let position = t
                    .position_of(key)
                    .ok_or_else(|| StoreError::row_not_found(table, key.clone()))?;
                let (row_id, row) = &mut t.rows[position];
                let previous = row.clone();
                row.extend(fields.clone());
                if !self.autocommit {
                    self.undo.push(Undo::Updated {
                        table: table.to_string(),
                        row_id: *row_id,
                        previous,
                    });
                }
                debug!(table, %key, "update");
                self.store
                    .record(Statement::write(StatementKind::Update, table, key.clone(), fields));
                Ok(key.clone())
            }
        }
    }

    fn delete(&mut self, table: &str, filter: &Filter) -> StoreResult<usize> {
        let t = self.tables.get_mut(table)?;
        let mut removed = Vec::new();
        let mut position = 0;
        let mut kept = Vec::with_capacity(t.rows.len());
        for (row_id, fields) in t.rows.drain(..) {
            if filter.matches(&fields) {
                removed.push(Undo::Deleted {
                    table: table.to_string(),
                    position,
                    row_id,
                    fields,
                });
            } else {
                kept.push((row_id, fields));
            }
            position += 1;
        }
        t.rows = kept;

        let count = removed.len();
        if !self.autocommit {
            // Positions are original indexes: restore the lowest first.
            self.undo.extend(removed.into_iter().rev());
        }
        debug!(table, count, "delete");
        self.store.record(Statement::delete(table));
        Ok(count)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.undo.clear();
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> StoreResult<()> {
        self.undo_all();
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_all();
        }
    }
}
