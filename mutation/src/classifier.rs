//! The Operation Classifier.
//!
//! Decides what a relation input asks for and rejects inputs whose
//! operations cannot be combined on that relation.

use crate::{MutationError, MutationInput, MutationResult, Operation, RelationInput};
use tether_core::Key;
use tether_registry::RelationDescriptor;

/// The single operation accepted on a singular relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SingularOp<'i> {
    Create(&'i MutationInput),
    Connect(&'i Key),
    Update(&'i Key, &'i MutationInput),
    /// Clear the link. Disconnect on a singular relation lands here too.
    SetNull,
}

/// A validated relation input.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<'i> {
    /// Exactly one operation on a singular relation.
    Singular(SingularOp<'i>),
    /// Incremental operations on a plural relation, in request order.
    Plural(Vec<&'i Operation>),
    /// The complete final membership of a plural relation.
    Sync(&'i [Key]),
}

/// Classify `input` against the relation it targets.
pub fn classify<'i>(
    input: &'i RelationInput,
    descriptor: &RelationDescriptor,
) -> MutationResult<Classified<'i>> {
    let operations = &input.operations;
    if operations.is_empty() {
        return Err(MutationError::empty_operation(&descriptor.name));
    }
    if descriptor.is_singular() {
        classify_singular(operations, descriptor).map(Classified::Singular)
    } else {
        classify_plural(operations, descriptor)
    }
}

fn classify_singular<'i>(
    operations: &'i [Operation],
    descriptor: &RelationDescriptor,
) -> MutationResult<SingularOp<'i>> {
    let [operation] = operations else {
        return Err(MutationError::ambiguous_operation(
            &descriptor.name,
            kinds(operations),
        ));
    };
    match operation {
        Operation::Create(input) => Ok(SingularOp::Create(input)),
        Operation::Connect(key) => Ok(SingularOp::Connect(key)),
        Operation::Update(key, input) => Ok(SingularOp::Update(key, input)),
        Operation::SetNull | Operation::Disconnect(_) => Ok(SingularOp::SetNull),
        Operation::Delete(_) | Operation::Sync(_) => Err(MutationError::invalid_operation(
            &descriptor.name,
            operation.kind().name(),
        )),
    }
}

fn classify_plural<'i>(
    operations: &'i [Operation],
    descriptor: &RelationDescriptor,
) -> MutationResult<Classified<'i>> {
    if let Some(op) = operations.iter().find(|op| matches!(op, Operation::SetNull)) {
        return Err(MutationError::invalid_operation(
            &descriptor.name,
            op.kind().name(),
        ));
    }

    let syncs = operations
        .iter()
        .filter(|op| matches!(op, Operation::Sync(_)))
        .count();
    match (syncs, operations) {
        (0, _) => Ok(Classified::Plural(operations.iter().collect())),
        (1, [Operation::Sync(keys)]) => Ok(Classified::Sync(keys)),
        _ => Err(MutationError::ambiguous_operation(
            &descriptor.name,
            kinds(operations),
        )),
    }
}

fn kinds(operations: &[Operation]) -> String {
    let names: Vec<&str> = operations.iter().map(|op| op.kind().name()).collect();
    names.join(", ")
}
