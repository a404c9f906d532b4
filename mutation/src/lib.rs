//! Tether Mutation
//!
//! Execute nested mutation trees against the relation graph.
//!
//! Responsibilities:
//! - Classify the operations requested on each relation
//! - Validate scalar fields against the entity's columns
//! - Order writes by foreign-key ownership
//! - Return the written record with touched relations attached
//!
//! # Module Structure
//!
//! - `input` - Mutation input tree (fields, relation inputs, operations)
//! - `classifier` - Operation Classifier (exclusivity and cardinality rules)
//! - `executor` - MutationExecutor, the two-pass walk per node
//! - `ops/` - Per-ownership operation implementations (parent-owned, child-owned, pivot)
//! - `validation` - Field validation helpers
//! - `error` - Error types for mutation failures

mod classifier;
mod error;
mod executor;
mod input;
mod ops;
mod validation;

pub use classifier::{classify, Classified, SingularOp};
pub use error::{MutationError, MutationResult};
pub use executor::MutationExecutor;
pub use input::{MutationInput, Operation, OperationKind, RelationInput};
