//! The engine: read and write entry points over one registry and one store.

use rayon::ThreadPool;
use std::collections::HashMap;
use std::sync::Arc;
use tether_core::{EntityRecord, Key, SelectionNode};
use tether_loader::{build_pool, BatchLoader, EagerLoadPlanner};
use tether_mutation::{MutationExecutor, MutationInput, MutationResult};
use tether_registry::RelationRegistry;
use tether_store::{Filter, Query, Reader, Storage, Transaction};
use tether_transaction::{CancelHandle, TransactionBoundary};
use tracing::{debug, instrument};

use crate::{EngineConfig, EngineResult};

/// Resolves selection trees and executes mutation trees.
///
/// The registry is shared read-only; each call gets its own records. One
/// engine serves concurrent calls.
pub struct Engine<S: Storage> {
    registry: Arc<RelationRegistry>,
    storage: Arc<S>,
    config: EngineConfig,
    pool: Option<ThreadPool>,
}

impl<S: Storage> Engine<S> {
    /// Create an engine, starting the load pool the configuration asks for.
    pub fn new(
        registry: Arc<RelationRegistry>,
        storage: Arc<S>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let pool = build_pool(config.max_eager_load_concurrency)?;
        Ok(Self {
            registry,
            storage,
            config,
            pool,
        })
    }

    /// Get the registry.
    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    /// Get the store.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==================== Read Path ====================

    /// Load the roots named by `root_keys` and annotate them with `selection`.
    ///
    /// Roots come back in `root_keys` order; keys with no row are skipped.
    #[instrument(level = "debug", target = "tether::engine", skip_all, fields(entity_type = %entity_type))]
    pub fn resolve_selection(
        &self,
        entity_type: &str,
        root_keys: &[Key],
        selection: &[SelectionNode],
    ) -> EngineResult<Vec<EntityRecord>> {
        let entity = self.registry.entity(entity_type)?;
        if root_keys.is_empty() {
            return Ok(Vec::new());
        }

        let values = root_keys.iter().map(Key::to_value).collect();
        let query =
            Query::table(&entity.table).filter(Filter::in_values(&entity.primary_key, values));
        let mut found = HashMap::new();
        for row in self.storage.query(&query)? {
            let record = EntityRecord::from_row(&entity.name, &entity.primary_key, row.fields)?;
            found.insert(record.key.clone(), record);
        }
        let roots: Vec<EntityRecord> = root_keys
            .iter()
            .filter_map(|key| found.get(key).cloned())
            .collect();
        debug!(requested = root_keys.len(), found = roots.len(), "roots loaded");

        let reader: &(dyn Reader + Sync) = &*self.storage;
        let loader = BatchLoader::new(&self.registry, reader)
            .with_default_pivot_order(self.config.default_pivot_order_column.as_deref());
        let planner = EagerLoadPlanner::new(&self.registry, loader, self.pool.as_ref());
        Ok(planner.plan(selection, roots)?)
    }

    // ==================== Write Path ====================

    /// Create a root entity from a nested input tree.
    pub fn execute_mutation(
        &self,
        entity_type: &str,
        input: &MutationInput,
    ) -> EngineResult<EntityRecord> {
        self.run_write(None, |executor, tx| {
            executor.execute_create(tx, entity_type, input)
        })
    }

    /// Create a root entity; cancelling `cancel` aborts and rolls back the call.
    pub fn execute_mutation_cancellable(
        &self,
        entity_type: &str,
        input: &MutationInput,
        cancel: &CancelHandle,
    ) -> EngineResult<EntityRecord> {
        self.run_write(Some(cancel), |executor, tx| {
            executor.execute_create(tx, entity_type, input)
        })
    }

    /// Update an existing root entity and apply the nested operations.
    pub fn execute_update(
        &self,
        entity_type: &str,
        key: &Key,
        input: &MutationInput,
    ) -> EngineResult<EntityRecord> {
        self.run_write(None, |executor, tx| {
            executor.execute_update(tx, entity_type, key, input)
        })
    }

    #[instrument(level = "debug", target = "tether::engine", skip_all)]
    fn run_write<F>(&self, cancel: Option<&CancelHandle>, f: F) -> EngineResult<EntityRecord>
    where
        F: FnOnce(&MutationExecutor<'_>, &mut dyn Transaction) -> MutationResult<EntityRecord>,
    {
        let mut executor = MutationExecutor::new(&self.registry)
            .with_default_pivot_order(self.config.default_pivot_order_column.as_deref());
        let mut boundary = TransactionBoundary::new(&*self.storage)
            .wrapped(self.config.wrap_mutations_in_transaction);
        if let Some(handle) = cancel {
            executor = executor.with_cancel(handle.clone());
            boundary = boundary.with_cancel(handle.clone());
        }
        boundary.run(|tx| Ok(f(&executor, tx)?))
    }
}
