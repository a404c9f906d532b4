//! Mutation input trees.

use std::fmt;
use tether_core::{Fields, Key};

/// Input for one entity: its scalar fields plus nested relation inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationInput {
    /// Column values to write.
    pub fields: Fields,
    /// Nested relation inputs, in request order.
    pub relations: Vec<RelationInput>,
}

impl MutationInput {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            relations: Vec::new(),
        }
    }

    /// Add a nested relation input.
    pub fn with(mut self, relation: RelationInput) -> Self {
        self.relations.push(relation);
        self
    }

    /// Add a nested relation input with the given operations.
    pub fn relation(self, name: impl Into<String>, operations: Vec<Operation>) -> Self {
        self.with(RelationInput::new(name, operations))
    }
}

/// The operations requested on one relation of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationInput {
    /// Relation name.
    pub relation: String,
    /// Asserted target type for PolymorphicTo relations.
    pub morph_type: Option<String>,
    /// Requested operations, in request order.
    pub operations: Vec<Operation>,
}

impl RelationInput {
    pub fn new(relation: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            relation: relation.into(),
            morph_type: None,
            operations,
        }
    }

    /// Assert the target type of a polymorphic relation.
    pub fn morph(mut self, type_tag: impl Into<String>) -> Self {
        self.morph_type = Some(type_tag.into());
        self
    }
}

/// One requested operation on a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a related row.
    Create(MutationInput),
    /// Associate an existing row.
    Connect(Key),
    /// Update an existing row and associate it.
    Update(Key, MutationInput),
    /// Remove an association without deleting the row.
    Disconnect(Key),
    /// Delete the related row.
    Delete(Key),
    /// Replace the complete membership of a plural relation.
    Sync(Vec<Key>),
    /// Clear a singular relation.
    SetNull,
}

impl Operation {
    /// Get the operation kind.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create(_) => OperationKind::Create,
            Operation::Connect(_) => OperationKind::Connect,
            Operation::Update(..) => OperationKind::Update,
            Operation::Disconnect(_) => OperationKind::Disconnect,
            Operation::Delete(_) => OperationKind::Delete,
            Operation::Sync(_) => OperationKind::Sync,
            Operation::SetNull => OperationKind::SetNull,
        }
    }
}

/// Operation tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Connect,
    Update,
    Disconnect,
    Delete,
    Sync,
    SetNull,
}

impl OperationKind {
    /// Returns the operation name.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Connect => "connect",
            OperationKind::Update => "update",
            OperationKind::Disconnect => "disconnect",
            OperationKind::Delete => "delete",
            OperationKind::Sync => "sync",
            OperationKind::SetNull => "setNull",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
