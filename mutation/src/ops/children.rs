//! Relations whose foreign key lives on the related rows.
//!
//! Runs after the parent row is written, so the parent's key is known.

use std::collections::{BTreeSet, HashSet};
use tether_core::{EntityRecord, Fields, Key, RecordError, Related, Value};
use tether_registry::{EntityDef, RelationDescriptor};
use tether_store::{Filter, Transaction};

use crate::classifier::{Classified, SingularOp};
use crate::error::{MutationError, MutationResult};
use crate::executor::MutationExecutor;
use crate::input::{MutationInput, Operation};

/// The columns tying a child row to one parent.
struct Link {
    /// Columns pointing a child at the parent.
    set: Fields,
    /// The same columns, nulled.
    cleared: Fields,
    /// Children currently pointing at the parent.
    filter: Filter,
}

impl Link {
    fn new(descriptor: &RelationDescriptor, parent: &EntityRecord) -> MutationResult<Self> {
        let value = parent
            .get(&descriptor.owner_key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| RecordError::missing_key(&parent.entity_type, &descriptor.owner_key))?;

        let mut set = Fields::new();
        let mut cleared = Fields::new();
        set.insert(descriptor.related_key.clone(), value.clone());
        cleared.insert(descriptor.related_key.clone(), Value::Null);
        let mut filter = Filter::eq(&descriptor.related_key, value);

        // PolymorphicMany children also record the parent's type.
        if let Some(column) = descriptor.type_column() {
            let tag = parent.entity_type.as_str();
            set.insert(column.to_string(), Value::from(tag));
            cleared.insert(column.to_string(), Value::Null);
            filter = filter.and(Filter::eq(column, tag));
        }
        Ok(Self {
            set,
            cleared,
            filter,
        })
    }
}

/// Apply a classified input to the children of `parent`.
pub(crate) fn apply(
    exec: &MutationExecutor<'_>,
    tx: &mut dyn Transaction,
    descriptor: &RelationDescriptor,
    parent: &EntityRecord,
    classified: &Classified<'_>,
) -> MutationResult<Related> {
    let target = exec.registry().entity(&descriptor.target_type)?;
    let link = Link::new(descriptor, parent)?;
    let children = Children {
        exec,
        target,
        link,
    };

    match classified {
        Classified::Singular(op) => children.apply_singular(tx, *op),
        Classified::Plural(operations) => {
            let mut touched = Vec::new();
            for operation in operations {
                if let Some(record) = children.apply_plural(tx, descriptor, operation)? {
                    touched.push(record);
                }
            }
            Ok(Related::Many(touched))
        }
        Classified::Sync(keys) => children.sync(tx, descriptor, keys).map(Related::Many),
    }
}

struct Children<'e, 'r> {
    exec: &'e MutationExecutor<'r>,
    target: &'r EntityDef,
    link: Link,
}

impl Children<'_, '_> {
    /// OneToOne: the new child replaces whichever child pointed at the parent.
    fn apply_singular(
        &self,
        tx: &mut dyn Transaction,
        op: SingularOp<'_>,
    ) -> MutationResult<Related> {
        let record = match op {
            SingularOp::SetNull => {
                self.detach_others(tx, None)?;
                return Ok(Related::One(None));
            }
            SingularOp::Create(input) => {
                self.detach_others(tx, None)?;
                self.create(tx, input)?
            }
            SingularOp::Connect(key) => {
                self.detach_others(tx, Some(key))?;
                self.connect(tx, key)?
            }
            SingularOp::Update(key, input) => {
                self.detach_others(tx, Some(key))?;
                self.update(tx, key, input)?
            }
        };
        Ok(Related::One(Some(Box::new(record))))
    }

    /// Returns the touched child, or None when it left the relation.
    fn apply_plural(
        &self,
        tx: &mut dyn Transaction,
        descriptor: &RelationDescriptor,
        operation: &Operation,
    ) -> MutationResult<Option<EntityRecord>> {
        match operation {
            Operation::Create(input) => self.create(tx, input).map(Some),
            Operation::Connect(key) => self.connect(tx, key).map(Some),
            Operation::Update(key, input) => self.update(tx, key, input).map(Some),
            Operation::Disconnect(key) => {
                let child = self.require_linked(tx, key)?;
                tx.execute_write(&self.target.table, self.link.cleared.clone(), Some(&child.key))?;
                Ok(None)
            }
            Operation::Delete(key) => {
                let filter = Filter::eq(&self.target.primary_key, key.clone())
                    .and(self.link.filter.clone());
                if tx.delete(&self.target.table, &filter)? == 0 {
                    return Err(MutationError::target_not_found(&self.target.name, key.clone()));
                }
                Ok(None)
            }
            Operation::Sync(_) | Operation::SetNull => Err(MutationError::invalid_operation(
                &descriptor.name,
                operation.kind().name(),
            )),
        }
    }

    /// Re-point foreign keys so exactly `keys` belong to the parent.
    fn sync(
        &self,
        tx: &mut dyn Transaction,
        descriptor: &RelationDescriptor,
        keys: &[Key],
    ) -> MutationResult<Vec<EntityRecord>> {
        let pk = &self.target.primary_key;
        let values = keys.iter().map(Key::to_value).collect();
        let requested = self.exec.find(tx, self.target, Filter::in_values(pk, values))?;
        let missing: Vec<Key> = keys
            .iter()
            .filter(|k| !requested.iter().any(|r| &r.key == *k))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MutationError::sync_target_not_found(&descriptor.name, &missing));
        }

        let current: BTreeSet<Key> = self
            .exec
            .find(tx, self.target, self.link.filter.clone())?
            .into_iter()
            .map(|r| r.key)
            .collect();
        for key in current.iter().filter(|k| !keys.contains(k)) {
            tx.execute_write(&self.target.table, self.link.cleared.clone(), Some(key))?;
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for key in keys.iter().filter(|k| seen.insert(*k)) {
            let Some(mut record) = requested.iter().find(|r| &r.key == key).cloned() else {
                continue;
            };
            if !current.contains(key) {
                tx.execute_write(&self.target.table, self.link.set.clone(), Some(key))?;
                record.fields.extend(self.link.set.clone());
            }
            result.push(record);
        }
        Ok(result)
    }

    fn create(
        &self,
        tx: &mut dyn Transaction,
        input: &MutationInput,
    ) -> MutationResult<EntityRecord> {
        self.exec.write_node(tx, self.target, None, input, &self.link.set)
    }

    fn connect(&self, tx: &mut dyn Transaction, key: &Key) -> MutationResult<EntityRecord> {
        let mut child = self
            .exec
            .require(tx, self.target, &self.target.primary_key, key)?;
        tx.execute_write(&self.target.table, self.link.set.clone(), Some(&child.key))?;
        child.fields.extend(self.link.set.clone());
        Ok(child)
    }

    fn update(
        &self,
        tx: &mut dyn Transaction,
        key: &Key,
        input: &MutationInput,
    ) -> MutationResult<EntityRecord> {
        self.exec
            .write_node(tx, self.target, Some(key), input, &self.link.set)
    }

    /// A child that currently points at the parent.
    fn require_linked(&self, tx: &mut dyn Transaction, key: &Key) -> MutationResult<EntityRecord> {
        let filter =
            Filter::eq(&self.target.primary_key, key.clone()).and(self.link.filter.clone());
        self.exec
            .find(tx, self.target, filter)?
            .into_iter()
            .next()
            .ok_or_else(|| MutationError::target_not_found(&self.target.name, key.clone()))
    }

    /// Null the link of every current child except `keep`.
    fn detach_others(&self, tx: &mut dyn Transaction, keep: Option<&Key>) -> MutationResult<()> {
        let current = self.exec.find(tx, self.target, self.link.filter.clone())?;
        for child in current.iter().filter(|c| Some(&c.key) != keep) {
            tx.execute_write(&self.target.table, self.link.cleared.clone(), Some(&child.key))?;
        }
        Ok(())
    }
}
