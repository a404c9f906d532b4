//! Batch loading of one relation for many parents.

use crate::{LoaderError, LoaderResult};
use std::collections::{BTreeMap, BTreeSet};
use tether_core::{EntityRecord, Fields, Key, Value};
use tether_registry::{RelationDescriptor, RelationKind, RelationRegistry};
use tether_store::{Filter, PivotJoin, Query, Reader, Row};
use tracing::debug;

/// The value linking a parent to its related rows.
///
/// For PolymorphicTo relations the parent's type tag is part of the link;
/// for every other kind `morph` is None.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub morph: Option<String>,
    pub key: Key,
}

impl LinkKey {
    pub fn plain(key: Key) -> Self {
        Self { morph: None, key }
    }

    pub fn morph(type_tag: impl Into<String>, key: Key) -> Self {
        Self {
            morph: Some(type_tag.into()),
            key,
        }
    }

    /// Read the link of `parent` for `descriptor`; None when the link column is null.
    pub fn of(descriptor: &RelationDescriptor, parent: &EntityRecord) -> Option<Self> {
        let key = parent
            .get(&descriptor.owner_key)
            .and_then(Key::from_value)?;
        match descriptor.kind {
            RelationKind::PolymorphicTo => {
                let type_tag = parent.get(descriptor.type_column()?)?.as_str()?;
                Some(Self::morph(type_tag, key))
            }
            _ => Some(Self::plain(key)),
        }
    }
}

/// Related records grouped by parent link, produced by one load.
#[derive(Debug, Default)]
pub struct LoadGroup {
    groups: BTreeMap<LinkKey, Vec<EntityRecord>>,
}

impl LoadGroup {
    /// Related records for one parent link (empty if none).
    pub fn get(&self, link: &LinkKey) -> &[EntityRecord] {
        self.groups.get(link).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of parent links with at least one related record.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over groups in link order.
    pub fn iter(&self) -> impl Iterator<Item = (&LinkKey, &Vec<EntityRecord>)> {
        self.groups.iter()
    }

    fn push(&mut self, link: LinkKey, record: EntityRecord) {
        self.groups.entry(link).or_default().push(record);
    }

    /// Fail if any parent got more than one row on a singular relation.
    fn ensure_singular(&self, relation: &str) -> LoaderResult<()> {
        match self.groups.iter().find(|(_, rows)| rows.len() > 1) {
            Some((link, rows)) => Err(LoaderError::data_integrity(
                relation,
                &link.key,
                rows.len(),
            )),
            None => Ok(()),
        }
    }
}

/// Loads one relation for a set of parent links with a single query.
pub struct BatchLoader<'a> {
    registry: &'a RelationRegistry,
    reader: &'a (dyn Reader + Sync),
    default_pivot_order: Option<&'a str>,
}

impl<'a> BatchLoader<'a> {
    /// Create a loader reading through `reader`.
    pub fn new(registry: &'a RelationRegistry, reader: &'a (dyn Reader + Sync)) -> Self {
        Self {
            registry,
            reader,
            default_pivot_order: None,
        }
    }

    /// Pivot order column for many-to-many relations that declare none.
    pub fn with_default_pivot_order(mut self, column: Option<&'a str>) -> Self {
        self.default_pivot_order = column;
        self
    }

    /// Load `descriptor` for every link in `links`.
    ///
    /// Issues one query per call (one per target type for PolymorphicTo) and
    /// none at all when `links` is empty.
    pub fn load(
        &self,
        descriptor: &RelationDescriptor,
        links: &BTreeSet<LinkKey>,
    ) -> LoaderResult<LoadGroup> {
        if links.is_empty() {
            return Ok(LoadGroup::default());
        }

        let group = match descriptor.kind {
            RelationKind::BelongsTo | RelationKind::OneToOne | RelationKind::OneToMany => {
                self.load_by_column(descriptor, links, None)?
            }
            RelationKind::PolymorphicMany => {
                let type_column = descriptor.type_column().unwrap_or_default();
                let filter = Filter::eq(type_column, descriptor.source_type.as_str());
                self.load_by_column(descriptor, links, Some(filter))?
            }
            RelationKind::PolymorphicTo => self.load_polymorphic(descriptor, links)?,
            RelationKind::ManyToMany => self.load_through_pivot(descriptor, links)?,
        };

        if descriptor.is_singular() {
            group.ensure_singular(&descriptor.name)?;
        }

        debug!(
            relation = %descriptor.name,
            links = links.len(),
            groups = group.len(),
            "batch load"
        );
        Ok(group)
    }

    /// Related rows whose `related_key` is one of the links.
    fn load_by_column(
        &self,
        descriptor: &RelationDescriptor,
        links: &BTreeSet<LinkKey>,
        extra: Option<Filter>,
    ) -> LoaderResult<LoadGroup> {
        let target = self.registry.entity(&descriptor.target_type)?;
        let mut filter = Filter::in_values(&descriptor.related_key, link_values(links));
        if let Some(extra) = extra {
            filter = filter.and(extra);
        }

        let rows = self
            .reader
            .query(&Query::table(&target.table).filter(filter))?;

        let mut group = LoadGroup::default();
        for row in rows {
            let Some(key) = link_column(&row.fields, &descriptor.related_key) else {
                continue;
            };
            let record = EntityRecord::from_row(&target.name, &target.primary_key, row.fields)?;
            group.push(LinkKey::plain(key), record);
        }
        Ok(group)
    }

    /// One query per distinct target type named by the links.
    fn load_polymorphic(
        &self,
        descriptor: &RelationDescriptor,
        links: &BTreeSet<LinkKey>,
    ) -> LoaderResult<LoadGroup> {
        let mut by_type: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
        for link in links {
            if let Some(type_tag) = link.morph.as_deref() {
                by_type.entry(type_tag).or_default().push(link.key.to_value());
            }
        }

        let mut group = LoadGroup::default();
        for (type_tag, values) in by_type {
            // A stored tag outside the allow-list means the row was written around us.
            self.registry.check_morph_type(descriptor, type_tag)?;
            let target = self.registry.entity(type_tag)?;
            let rows = self.reader.query(
                &Query::table(&target.table)
                    .filter(Filter::in_values(&descriptor.related_key, values)),
            )?;
            for row in rows {
                let Some(key) = link_column(&row.fields, &descriptor.related_key) else {
                    continue;
                };
                let record =
                    EntityRecord::from_row(&target.name, &target.primary_key, row.fields)?;
                group.push(LinkKey::morph(type_tag, key), record);
            }
        }
        Ok(group)
    }

    /// Related rows joined through the pivot table, grouped by the pivot's owner column.
    fn load_through_pivot(
        &self,
        descriptor: &RelationDescriptor,
        links: &BTreeSet<LinkKey>,
    ) -> LoaderResult<LoadGroup> {
        let target = self.registry.entity(&descriptor.target_type)?;
        let Some(pivot) = &descriptor.pivot else {
            return Err(LoaderError::unknown_relation(
                &descriptor.source_type,
                &descriptor.name,
            ));
        };
        let order_column = pivot
            .order_column
            .clone()
            .or_else(|| self.default_pivot_order.map(str::to_string));

        let query = Query::table(&target.table).join(PivotJoin {
            table: pivot.table.clone(),
            related_column: pivot.related_column.clone(),
            target_column: descriptor.related_key.clone(),
            filter: Filter::in_values(&pivot.owner_column, link_values(links)),
            order_column,
        });
        let rows = self.reader.query(&query)?;

        let mut group = LoadGroup::default();
        for Row { fields, pivot: joined } in rows {
            let Some(owner) = joined
                .as_ref()
                .and_then(|p| link_column(p, &pivot.owner_column))
            else {
                continue;
            };
            let record = EntityRecord::from_row(&target.name, &target.primary_key, fields)?;
            group.push(LinkKey::plain(owner), record);
        }
        Ok(group)
    }
}

fn link_values(links: &BTreeSet<LinkKey>) -> Vec<Value> {
    links.iter().map(|l| l.key.to_value()).collect()
}

fn link_column(fields: &Fields, column: &str) -> Option<Key> {
    fields.get(column).and_then(Key::from_value)
}
