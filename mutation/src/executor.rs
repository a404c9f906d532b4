//! Mutation executor - walks a nested input tree in foreign-key order.
//!
//! Every node is written in two passes:
//! - pass 1 resolves relations whose foreign key lives on this node
//!   (BelongsTo, PolymorphicTo), so the node's row can carry the key
//! - the node's own row is written once
//! - pass 2 handles relations whose key lives elsewhere
//!   (`ops/children.rs` for child-owned keys, `ops/pivot.rs` for pivot rows)
//!
//! The executor is sequential; atomicity comes from the transaction it is
//! handed.

use std::collections::HashSet;
use tether_core::{EntityRecord, Fields, Key, Related};
use tether_registry::{EntityDef, KeyOwner, RelationDescriptor, RelationRegistry};
use tether_store::{Filter, Query, Transaction};
use tether_transaction::CancelHandle;
use tracing::debug;

use crate::classifier::{classify, Classified};
use crate::error::{MutationError, MutationResult};
use crate::input::{MutationInput, RelationInput};
use crate::ops;
use crate::validation::validate_fields;

/// A classified relation input of one node.
struct Step<'r, 'i> {
    descriptor: &'r RelationDescriptor,
    input: &'i RelationInput,
    classified: Classified<'i>,
}

/// Mutation executor.
pub struct MutationExecutor<'r> {
    registry: &'r RelationRegistry,
    cancel: Option<CancelHandle>,
    default_pivot_order: Option<&'r str>,
}

impl<'r> MutationExecutor<'r> {
    /// Create a new executor.
    pub fn new(registry: &'r RelationRegistry) -> Self {
        Self {
            registry,
            cancel: None,
            default_pivot_order: None,
        }
    }

    /// Abort at the next node once `handle` is cancelled.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Pivot order column for many-to-many relations that declare none.
    pub fn with_default_pivot_order(mut self, column: Option<&'r str>) -> Self {
        self.default_pivot_order = column;
        self
    }

    /// Create a root entity and everything nested below it.
    pub fn execute_create(
        &self,
        tx: &mut dyn Transaction,
        entity_type: &str,
        input: &MutationInput,
    ) -> MutationResult<EntityRecord> {
        let entity = self.registry.entity(entity_type)?;
        self.write_node(tx, entity, None, input, &Fields::new())
    }

    /// Update an existing root entity and apply the nested operations.
    pub fn execute_update(
        &self,
        tx: &mut dyn Transaction,
        entity_type: &str,
        key: &Key,
        input: &MutationInput,
    ) -> MutationResult<EntityRecord> {
        let entity = self.registry.entity(entity_type)?;
        self.write_node(tx, entity, Some(key), input, &Fields::new())
    }

    pub(crate) fn registry(&self) -> &'r RelationRegistry {
        self.registry
    }

    pub(crate) fn default_pivot_order(&self) -> Option<&'r str> {
        self.default_pivot_order
    }

    /// Write one node (insert when `key` is None) and its nested relations.
    ///
    /// `preset` columns are written over the input's own fields; child-owned
    /// relations use it to force the foreign key to the parent.
    pub(crate) fn write_node(
        &self,
        tx: &mut dyn Transaction,
        entity: &EntityDef,
        key: Option<&Key>,
        input: &MutationInput,
        preset: &Fields,
    ) -> MutationResult<EntityRecord> {
        self.ensure_not_cancelled()?;
        validate_fields(entity, &input.fields)?;
        let steps = self.classify_relations(entity, input)?;

        let existing = match key {
            Some(key) => Some(self.require(tx, entity, &entity.primary_key, key)?),
            None => None,
        };

        // Pass 1: relations whose key this row stores.
        let mut row = input.fields.clone();
        let mut attached: Vec<Option<Related>> = vec![None; steps.len()];
        for (i, step) in steps.iter().enumerate() {
            if step.descriptor.key_owner() != KeyOwner::Parent {
                continue;
            }
            if let Classified::Singular(op) = step.classified {
                attached[i] = Some(ops::owned::apply(
                    self,
                    tx,
                    step.descriptor,
                    step.input,
                    op,
                    &mut row,
                )?);
            }
        }
        row.extend(preset.clone());

        let mut record = match existing {
            None => {
                let key = tx.execute_write(&entity.table, row.clone(), None)?;
                row.insert(entity.primary_key.clone(), key.to_value());
                EntityRecord::new(&entity.name, key, row)
            }
            Some(mut record) => {
                if !row.is_empty() {
                    tx.execute_write(&entity.table, row.clone(), Some(&record.key))?;
                    record.fields.extend(row);
                }
                record
            }
        };
        debug!(entity = %entity.name, key = %record.key, "node written");

        // Pass 2: relations that need this row's key.
        for (i, step) in steps.iter().enumerate() {
            let related = match step.descriptor.key_owner() {
                KeyOwner::Parent => continue,
                KeyOwner::Child => {
                    ops::children::apply(self, tx, step.descriptor, &record, &step.classified)?
                }
                KeyOwner::Pivot => {
                    ops::pivot::apply(self, tx, step.descriptor, &record, &step.classified)?
                }
            };
            attached[i] = Some(related);
        }

        for (step, related) in steps.iter().zip(attached) {
            if let Some(related) = related {
                record.attach(&step.descriptor.name, related);
            }
        }
        Ok(record)
    }

    /// Resolve and classify every relation input before any write.
    fn classify_relations<'i>(
        &self,
        entity: &EntityDef,
        input: &'i MutationInput,
    ) -> MutationResult<Vec<Step<'r, 'i>>> {
        let mut seen = HashSet::new();
        input
            .relations
            .iter()
            .map(|relation| {
                if !seen.insert(relation.relation.as_str()) {
                    return Err(MutationError::ambiguous_operation(
                        &relation.relation,
                        "relation given twice",
                    ));
                }
                let descriptor = self.registry.resolve(&entity.name, &relation.relation)?;
                let classified = classify(relation, descriptor)?;
                Ok(Step {
                    descriptor,
                    input: relation,
                    classified,
                })
            })
            .collect()
    }

    /// Rows of `entity` matching `filter`.
    pub(crate) fn find(
        &self,
        tx: &mut dyn Transaction,
        entity: &EntityDef,
        filter: Filter,
    ) -> MutationResult<Vec<EntityRecord>> {
        let rows = tx.query(&Query::table(&entity.table).filter(filter))?;
        rows.into_iter()
            .map(|row| {
                EntityRecord::from_row(&entity.name, &entity.primary_key, row.fields)
                    .map_err(MutationError::from)
            })
            .collect()
    }

    /// The row of `entity` whose `column` equals `key`.
    pub(crate) fn require(
        &self,
        tx: &mut dyn Transaction,
        entity: &EntityDef,
        column: &str,
        key: &Key,
    ) -> MutationResult<EntityRecord> {
        self.find(tx, entity, Filter::eq(column, key.clone()))?
            .into_iter()
            .next()
            .ok_or_else(|| MutationError::target_not_found(&entity.name, key.clone()))
    }

    fn ensure_not_cancelled(&self) -> MutationResult<()> {
        match &self.cancel {
            Some(handle) if handle.is_cancelled() => Err(MutationError::Cancelled),
            _ => Ok(()),
        }
    }
}
