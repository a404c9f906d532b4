//! Many-to-many relations: both keys live in a pivot table.
//!
//! Runs after the parent row is written; targets are created or resolved
//! before their pivot row is inserted.

use std::collections::HashSet;
use tether_core::{EntityRecord, Fields, Key, RecordError, Related, Value};
use tether_registry::{EntityDef, PivotDef, RegistryError, RelationDescriptor};
use tether_store::{Filter, Query, Transaction};
use tracing::debug;

use crate::classifier::Classified;
use crate::error::{MutationError, MutationResult};
use crate::executor::MutationExecutor;
use crate::input::Operation;

/// Apply a classified input to the pivot rows of `parent`.
pub(crate) fn apply(
    exec: &MutationExecutor<'_>,
    tx: &mut dyn Transaction,
    descriptor: &RelationDescriptor,
    parent: &EntityRecord,
    classified: &Classified<'_>,
) -> MutationResult<Related> {
    let pivot = descriptor
        .pivot
        .as_ref()
        .ok_or_else(|| RegistryError::MissingPivot {
            relation: descriptor.name.clone(),
        })?;
    let owner = parent
        .get(&descriptor.owner_key)
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| RecordError::missing_key(&parent.entity_type, &descriptor.owner_key))?;
    let pivots = Pivots {
        exec,
        descriptor,
        target: exec.registry().entity(&descriptor.target_type)?,
        pivot,
        order_column: pivot.order_column.as_deref().or(exec.default_pivot_order()),
        owner,
    };

    match classified {
        Classified::Plural(operations) => {
            let mut touched = Vec::new();
            for operation in operations {
                if let Some(record) = pivots.apply_one(tx, operation)? {
                    touched.push(record);
                }
            }
            Ok(Related::Many(touched))
        }
        Classified::Sync(keys) => pivots.sync(tx, keys).map(Related::Many),
        Classified::Singular(_) => Err(MutationError::invalid_operation(
            &descriptor.name,
            descriptor.kind.name(),
        )),
    }
}

struct Pivots<'e, 'r> {
    exec: &'e MutationExecutor<'r>,
    descriptor: &'e RelationDescriptor,
    target: &'r EntityDef,
    pivot: &'e PivotDef,
    /// Position column written with each new pair, if any.
    order_column: Option<&'e str>,
    /// The parent's value stored in the pivot's owner column.
    owner: Value,
}

impl Pivots<'_, '_> {
    /// Returns the touched target, or None when it left the relation.
    fn apply_one(
        &self,
        tx: &mut dyn Transaction,
        operation: &Operation,
    ) -> MutationResult<Option<EntityRecord>> {
        match operation {
            Operation::Create(input) => {
                let record = self
                    .exec
                    .write_node(tx, self.target, None, input, &Fields::new())?;
                let position = self.next_position(tx)?;
                let row = self.row(self.link_of(&record)?, position);
                tx.execute_write(&self.pivot.table, row, None)?;
                Ok(Some(record))
            }
            Operation::Connect(key) => {
                let record = self.require(tx, key)?;
                self.ensure_pair(tx, self.link_of(&record)?)?;
                Ok(Some(record))
            }
            Operation::Update(key, input) => {
                let current = self.require(tx, key)?;
                let record = self.exec.write_node(
                    tx,
                    self.target,
                    Some(&current.key),
                    input,
                    &Fields::new(),
                )?;
                self.ensure_pair(tx, self.link_of(&record)?)?;
                Ok(Some(record))
            }
            Operation::Disconnect(key) => {
                if tx.delete(&self.pivot.table, &self.pair(key.to_value()))? == 0 {
                    return Err(MutationError::target_not_found(&self.target.name, key.clone()));
                }
                Ok(None)
            }
            Operation::Delete(key) => {
                let record = self.require(tx, key)?;
                let link = self.link_of(&record)?;
                let paired = Query::table(&self.pivot.table).filter(self.pair(link.clone()));
                if tx.query(&paired)?.is_empty() {
                    return Err(MutationError::target_not_found(&self.target.name, key.clone()));
                }
                // Pairs held by other owners go with the row.
                tx.delete(&self.pivot.table, &Filter::eq(&self.pivot.related_column, link))?;
                let row = Filter::eq(&self.target.primary_key, record.key.clone());
                tx.delete(&self.target.table, &row)?;
                Ok(None)
            }
            Operation::Sync(_) | Operation::SetNull => Err(MutationError::invalid_operation(
                &self.descriptor.name,
                operation.kind().name(),
            )),
        }
    }

    /// Replace the parent's pivot rows with exactly `keys`.
    ///
    /// Every key must exist before any pivot row changes. Pairs present
    /// on both sides are left alone.
    fn sync(&self, tx: &mut dyn Transaction, keys: &[Key]) -> MutationResult<Vec<EntityRecord>> {
        let related_key = &self.descriptor.related_key;
        let values: Vec<Value> = keys.iter().map(Key::to_value).collect();
        let requested = self
            .exec
            .find(tx, self.target, Filter::in_values(related_key, values.clone()))?;
        let missing: Vec<Key> = keys
            .iter()
            .filter(|k| !requested.iter().any(|r| r.get(related_key) == Some(&k.to_value())))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MutationError::sync_target_not_found(&self.descriptor.name, &missing));
        }

        let current = self.current(tx)?;
        let removed: Vec<Value> = current
            .iter()
            .filter(|v| !values.contains(v))
            .cloned()
            .collect();
        let removed_count = removed.len();
        if !removed.is_empty() {
            let filter = self
                .owner_filter()
                .and(Filter::in_values(&self.pivot.related_column, removed));
            tx.delete(&self.pivot.table, &filter)?;
        }

        let mut position = self.next_position(tx)?;
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut added = 0;
        for key in keys.iter().filter(|k| seen.insert(*k)) {
            let value = key.to_value();
            if !current.contains(&value) {
                tx.execute_write(&self.pivot.table, self.row(value.clone(), position), None)?;
                position = position.map(|p| p + 1);
                added += 1;
            }
            if let Some(record) = requested.iter().find(|r| r.get(related_key) == Some(&value)) {
                result.push(record.clone());
            }
        }
        debug!(
            relation = %self.descriptor.name,
            removed = removed_count,
            added,
            "pivot sync"
        );
        Ok(result)
    }

    /// Related-side values currently paired with the parent, in pivot order.
    fn current(&self, tx: &mut dyn Transaction) -> MutationResult<Vec<Value>> {
        let rows = tx.query(&Query::table(&self.pivot.table).filter(self.owner_filter()))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.fields.get(&self.pivot.related_column).cloned())
            .collect())
    }

    /// Insert the pair unless it already exists.
    fn ensure_pair(&self, tx: &mut dyn Transaction, related: Value) -> MutationResult<()> {
        let query = Query::table(&self.pivot.table).filter(self.pair(related.clone()));
        if tx.query(&query)?.is_empty() {
            let position = self.next_position(tx)?;
            tx.execute_write(&self.pivot.table, self.row(related, position), None)?;
        }
        Ok(())
    }

    /// One past the parent's highest position, or None when pairs are unordered.
    fn next_position(&self, tx: &mut dyn Transaction) -> MutationResult<Option<i64>> {
        let Some(column) = self.order_column else {
            return Ok(None);
        };
        let rows = tx.query(&Query::table(&self.pivot.table).filter(self.owner_filter()))?;
        let last = rows
            .iter()
            .filter_map(|row| row.fields.get(column).and_then(Value::as_int))
            .max()
            .unwrap_or(0);
        Ok(Some(last + 1))
    }

    fn require(&self, tx: &mut dyn Transaction, key: &Key) -> MutationResult<EntityRecord> {
        self.exec
            .require(tx, self.target, &self.descriptor.related_key, key)
    }

    /// The value the pivot's related column stores for `record`.
    fn link_of(&self, record: &EntityRecord) -> MutationResult<Value> {
        let column = &self.descriptor.related_key;
        record
            .get(column)
            .cloned()
            .ok_or_else(|| RecordError::missing_key(&record.entity_type, column).into())
    }

    fn row(&self, related: Value, position: Option<i64>) -> Fields {
        let mut row = Fields::new();
        row.insert(self.pivot.owner_column.clone(), self.owner.clone());
        row.insert(self.pivot.related_column.clone(), related);
        if let (Some(column), Some(position)) = (self.order_column, position) {
            row.insert(column.to_string(), Value::Int(position));
        }
        row
    }

    fn owner_filter(&self) -> Filter {
        Filter::eq(&self.pivot.owner_column, self.owner.clone())
    }

    fn pair(&self, related: Value) -> Filter {
        self.owner_filter()
            .and(Filter::eq(&self.pivot.related_column, related))
    }
}
