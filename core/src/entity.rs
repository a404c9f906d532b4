//! Entity records.
//!
//! An `EntityRecord` is one row of one entity type plus whatever related
//! records the planner or the mutation executor attached to it.

use crate::{Fields, Key, RecordError, RecordResult, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Records attached under one relation name.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// Singular relation; `None` when no related row exists.
    One(Option<Box<EntityRecord>>),
    /// Plural relation, in load order.
    Many(Vec<EntityRecord>),
}

impl Related {
    /// Get the single related record, if this is a loaded singular relation.
    pub fn as_one(&self) -> Option<&EntityRecord> {
        match self {
            Related::One(Some(record)) => Some(record),
            _ => None,
        }
    }

    /// Get the related records as a slice (empty for singular relations).
    pub fn as_many(&self) -> &[EntityRecord] {
        match self {
            Related::Many(records) => records,
            Related::One(_) => &[],
        }
    }

    /// Number of attached records.
    pub fn len(&self) -> usize {
        match self {
            Related::One(Some(_)) => 1,
            Related::One(None) => 0,
            Related::Many(records) => records.len(),
        }
    }

    /// Returns true if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A row of one entity type with its attached relations.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Entity type tag (registry name, e.g. "User").
    pub entity_type: String,
    /// Primary key.
    pub key: Key,
    /// Column values.
    pub fields: Fields,
    /// Attached relations by relation name.
    pub relations: BTreeMap<String, Related>,
    /// Relations attached only to satisfy a dependent computation.
    load_only: BTreeSet<String>,
}

impl EntityRecord {
    /// Create a record with no attached relations.
    pub fn new(entity_type: impl Into<String>, key: Key, fields: Fields) -> Self {
        Self {
            entity_type: entity_type.into(),
            key,
            fields,
            relations: BTreeMap::new(),
            load_only: BTreeSet::new(),
        }
    }

    /// Build a record from a stored row, reading the key from `key_column`.
    pub fn from_row(
        entity_type: impl Into<String>,
        key_column: &str,
        fields: Fields,
    ) -> RecordResult<Self> {
        let entity_type = entity_type.into();
        let key = fields
            .get(key_column)
            .and_then(Key::from_value)
            .ok_or_else(|| RecordError::missing_key(&entity_type, key_column))?;
        Ok(Self::new(entity_type, key, fields))
    }

    /// Get a field value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Get an attached relation by name.
    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// Attach related records under `name`.
    pub fn attach(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    /// Attach related records that are hidden from serialized output.
    pub fn attach_load_only(&mut self, name: impl Into<String>, related: Related) {
        let name = name.into();
        self.load_only.insert(name.clone());
        self.relations.insert(name, related);
    }

    /// Returns true if the relation was attached as load-only.
    pub fn is_load_only(&self, name: &str) -> bool {
        self.load_only.contains(name)
    }

    /// Iterate over the relations visible to the caller.
    pub fn visible_relations(&self) -> impl Iterator<Item = (&String, &Related)> {
        self.relations
            .iter()
            .filter(|(name, _)| !self.load_only.contains(*name))
    }
}

impl Serialize for Related {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Related::One(record) => record.serialize(serializer),
            Related::Many(records) => records.serialize(serializer),
        }
    }
}

impl Serialize for EntityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let visible: Vec<_> = self.visible_relations().collect();
        let mut map = serializer.serialize_map(Some(self.fields.len() + visible.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        for (name, related) in visible {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}
