//! Field validation helpers for mutation operations.

use crate::{MutationError, MutationResult};
use tether_core::Fields;
use tether_registry::EntityDef;

/// Check that every written column is declared on the entity.
pub fn validate_fields(entity: &EntityDef, fields: &Fields) -> MutationResult<()> {
    match fields.keys().find(|column| !entity.has_column(column)) {
        Some(column) => Err(MutationError::unknown_field(&entity.name, column)),
        None => Ok(()),
    }
}
