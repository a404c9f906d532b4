//! The Eager-Load Planner.
//!
//! Resolves a selection tree level by level. Entities reached at one depth
//! are deduplicated by (type, key) in an arena, every distinct
//! (entity type, relation) pair at that depth is loaded with one batch load,
//! and the results become the parents of the next depth. The annotated
//! output is rebuilt by following the selection tree, so self-referencing
//! schemas never recurse deeper than the request.

use crate::{BatchLoader, LinkKey, LoadGroup, LoaderError, LoaderResult};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tether_core::{EntityRecord, Key, Related, SelectionNode};
use tether_registry::{RelationDescriptor, RelationRegistry};
use tracing::{debug, debug_span};

/// Build the pool sibling loads run on; None means sequential loading.
pub fn build_pool(max_concurrency: usize) -> LoaderResult<Option<ThreadPool>> {
    if max_concurrency <= 1 {
        return Ok(None);
    }
    ThreadPoolBuilder::new()
        .num_threads(max_concurrency)
        .thread_name(|i| format!("tether-load-{i}"))
        .build()
        .map(Some)
        .map_err(|e| LoaderError::Pool(e.to_string()))
}

/// Resolved links of one entity for one relation.
#[derive(Debug, Clone)]
enum Edge {
    One(Option<usize>),
    Many(Vec<usize>),
}

/// Every entity reached by the plan, stored once per (type, key).
#[derive(Debug, Default)]
struct Arena {
    records: Vec<EntityRecord>,
    edges: Vec<BTreeMap<String, Edge>>,
    index: HashMap<(String, Key), usize>,
}

impl Arena {
    /// Insert a record, returning the slot of an existing copy if there is one.
    fn insert(&mut self, record: EntityRecord) -> usize {
        let id = (record.entity_type.clone(), record.key.clone());
        if let Some(slot) = self.index.get(&id) {
            return *slot;
        }
        let slot = self.records.len();
        self.records.push(record);
        self.edges.push(BTreeMap::new());
        self.index.insert(id, slot);
        slot
    }

    fn edge(&self, slot: usize, relation: &str) -> Option<&Edge> {
        self.edges[slot].get(relation)
    }

    fn children(&self, slot: usize, relation: &str) -> Vec<usize> {
        match self.edge(slot, relation) {
            Some(Edge::One(child)) => child.iter().copied().collect(),
            Some(Edge::Many(children)) => children.clone(),
            None => Vec::new(),
        }
    }
}

/// An entity waiting for the selections below it.
struct Pending<'s> {
    slot: usize,
    selection: &'s [SelectionNode],
    path: String,
}

/// One batch load: a relation of one entity type, for every parent at this depth.
struct LoadJob<'r, 's> {
    descriptor: &'r RelationDescriptor,
    /// Path of the first selection that requested the load.
    path: String,
    /// Parents still missing the relation, in first-appearance order.
    slots: Vec<usize>,
    seen: HashSet<usize>,
    links: BTreeSet<LinkKey>,
    /// Every (parent, selection) pair waiting on this relation.
    branches: Vec<(usize, &'s SelectionNode, String)>,
}

/// Turns a selection tree into batched relation loads.
pub struct EagerLoadPlanner<'a> {
    registry: &'a RelationRegistry,
    loader: BatchLoader<'a>,
    pool: Option<&'a ThreadPool>,
}

impl<'a> EagerLoadPlanner<'a> {
    /// Create a planner. Without a pool, sibling loads run sequentially.
    pub fn new(
        registry: &'a RelationRegistry,
        loader: BatchLoader<'a>,
        pool: Option<&'a ThreadPool>,
    ) -> Self {
        Self {
            registry,
            loader,
            pool,
        }
    }

    /// Load every relation named by `selection` below `roots`.
    ///
    /// Returns the roots in input order with relations attached. Fails as a
    /// whole when any branch fails; the error names the failing path.
    pub fn plan(
        &self,
        selection: &[SelectionNode],
        roots: Vec<EntityRecord>,
    ) -> LoaderResult<Vec<EntityRecord>> {
        let selection = SelectionNode::merge_siblings(selection);
        let mut arena = Arena::default();
        let root_slots: Vec<usize> = roots.into_iter().map(|r| arena.insert(r)).collect();

        let mut seen_roots = HashSet::new();
        let mut frontier: Vec<Pending<'_>> = root_slots
            .iter()
            .filter(|slot| seen_roots.insert(**slot))
            .map(|slot| Pending {
                slot: *slot,
                selection: &selection,
                path: String::new(),
            })
            .collect();

        let mut depth = 0;
        while !frontier.is_empty() {
            let _span = debug_span!("plan_level", depth).entered();
            let jobs = self.collect_jobs(&arena, &frontier)?;
            if jobs.is_empty() {
                break;
            }
            let loads = self.run_jobs(&jobs);
            frontier = attach(&mut arena, &jobs, loads)?;
            depth += 1;
        }

        Ok(root_slots
            .iter()
            .map(|slot| materialize(&arena, *slot, &selection))
            .collect())
    }

    /// Group the relations requested at this depth into batch loads.
    fn collect_jobs<'s>(
        &self,
        arena: &Arena,
        frontier: &[Pending<'s>],
    ) -> LoaderResult<Vec<LoadJob<'a, 's>>> {
        let mut jobs: Vec<LoadJob<'a, 's>> = Vec::new();
        let mut by_pair: HashMap<(&str, &str), usize> = HashMap::new();

        for pending in frontier {
            let parent = &arena.records[pending.slot];
            for node in pending.selection {
                let path = join_path(&pending.path, &node.field_name);
                let Some(descriptor) = self.registry.find(&parent.entity_type, &node.field_name)
                else {
                    if node.children.is_empty() && self.is_column(parent, &node.field_name) {
                        continue;
                    }
                    return Err(LoaderError::branch(
                        path,
                        LoaderError::unknown_relation(&parent.entity_type, &node.field_name),
                    ));
                };

                let index = *by_pair
                    .entry((descriptor.source_type.as_str(), descriptor.name.as_str()))
                    .or_insert_with(|| {
                        jobs.push(LoadJob {
                            descriptor,
                            path: path.clone(),
                            slots: Vec::new(),
                            seen: HashSet::new(),
                            links: BTreeSet::new(),
                            branches: Vec::new(),
                        });
                        jobs.len() - 1
                    });
                let job = &mut jobs[index];

                let loaded = arena.edge(pending.slot, &descriptor.name).is_some();
                if !loaded && job.seen.insert(pending.slot) {
                    job.slots.push(pending.slot);
                    if let Some(link) = LinkKey::of(descriptor, parent) {
                        job.links.insert(link);
                    }
                }
                job.branches.push((pending.slot, node, path));
            }
        }
        Ok(jobs)
    }

    fn is_column(&self, record: &EntityRecord, name: &str) -> bool {
        self.registry
            .entity(&record.entity_type)
            .map(|e| e.has_column(name))
            .unwrap_or(false)
    }

    /// Run one batch load per job, in job order.
    fn run_jobs(&self, jobs: &[LoadJob<'_, '_>]) -> Vec<LoaderResult<LoadGroup>> {
        let load = |job: &LoadJob<'_, '_>| self.loader.load(job.descriptor, &job.links);
        match self.pool {
            Some(pool) if jobs.len() > 1 => pool.install(|| jobs.par_iter().map(load).collect()),
            _ => jobs.iter().map(load).collect(),
        }
    }
}

/// Attach load results to their parents and return the next depth's frontier.
fn attach<'s>(
    arena: &mut Arena,
    jobs: &[LoadJob<'_, 's>],
    loads: Vec<LoaderResult<LoadGroup>>,
) -> LoaderResult<Vec<Pending<'s>>> {
    let mut next = Vec::new();
    // A path names one merged selection node, so (slot, path) is one pending unit.
    let mut queued: HashSet<(usize, String)> = HashSet::new();
    for (job, load) in jobs.iter().zip(loads) {
        let group = load.map_err(|e| LoaderError::branch(&job.path, e))?;
        let descriptor = job.descriptor;
        debug!(
            relation = %descriptor.name,
            parents = job.slots.len(),
            groups = group.len(),
            "attach"
        );

        for slot in &job.slots {
            let related = LinkKey::of(descriptor, &arena.records[*slot])
                .map(|link| group.get(&link).to_vec())
                .unwrap_or_default();
            let children: Vec<usize> = related.into_iter().map(|r| arena.insert(r)).collect();
            let edge = if descriptor.is_singular() {
                Edge::One(children.first().copied())
            } else {
                Edge::Many(children)
            };
            arena.edges[*slot].insert(descriptor.name.clone(), edge);
        }

        for (slot, node, path) in &job.branches {
            let node: &'s SelectionNode = *node;
            if node.children.is_empty() {
                continue;
            }
            for child in arena.children(*slot, &descriptor.name) {
                if !queued.insert((child, path.clone())) {
                    continue;
                }
                next.push(Pending {
                    slot: child,
                    selection: &node.children,
                    path: path.clone(),
                });
            }
        }
    }
    Ok(next)
}

/// Rebuild the record at `slot` with the relations `selection` asks for.
fn materialize(arena: &Arena, slot: usize, selection: &[SelectionNode]) -> EntityRecord {
    let mut record = arena.records[slot].clone();
    for node in selection {
        let Some(edge) = arena.edge(slot, &node.field_name) else {
            continue;
        };
        let related = match edge {
            Edge::One(child) => Related::One(
                child.map(|c| Box::new(materialize(arena, c, &node.children))),
            ),
            Edge::Many(children) => Related::Many(
                children
                    .iter()
                    .map(|c| materialize(arena, *c, &node.children))
                    .collect(),
            ),
        };
        if node.load_only {
            record.attach_load_only(&node.field_name, related);
        } else {
            record.attach(&node.field_name, related);
        }
    }
    record
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}
