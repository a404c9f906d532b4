//! Record helpers for scenario assertions.

use tether_core::{EntityRecord, Value};

/// Panicking accessors over a resolved or written record.
pub trait RecordExt {
    /// The record attached under a singular relation.
    fn one(&self, relation: &str) -> &EntityRecord;

    /// Records attached under a plural relation.
    fn many(&self, relation: &str) -> &[EntityRecord];

    /// A string column.
    fn text(&self, column: &str) -> &str;
}

impl RecordExt for EntityRecord {
    fn one(&self, relation: &str) -> &EntityRecord {
        self.relation(relation)
            .and_then(|r| r.as_one())
            .unwrap_or_else(|| panic!("{} has no {relation} attached", self.entity_type))
    }

    fn many(&self, relation: &str) -> &[EntityRecord] {
        self.relation(relation)
            .map(|r| r.as_many())
            .unwrap_or_else(|| panic!("{} has no {relation} attached", self.entity_type))
    }

    fn text(&self, column: &str) -> &str {
        match self.get(column) {
            Some(Value::String(s)) => s,
            other => panic!("{}.{column} is not a string: {other:?}", self.entity_type),
        }
    }
}

/// A string column of each record, in order.
pub fn texts<'r>(records: &'r [EntityRecord], column: &str) -> Vec<&'r str> {
    records.iter().map(|r| r.text(column)).collect()
}
