//! Tether Registry
//!
//! Runtime relation lookup. Single source of truth for entity definitions and
//! relation descriptors, consulted by both the eager-load planner and the
//! nested-mutation executor.
//! The registry is immutable after construction via RegistryBuilder.

mod builder;
mod error;
mod registry;
mod types;

pub use builder::{EntityBuilder, RegistryBuilder, RelationBuilder};
pub use error::{RegistryError, RegistryResult};
pub use registry::RelationRegistry;
pub use types::*;
