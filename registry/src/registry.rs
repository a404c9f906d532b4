//! The RelationRegistry - immutable relation lookup.

use crate::{EntityDef, RegistryError, RegistryResult, RelationDescriptor, RelationKind};
use std::collections::HashMap;

/// The RelationRegistry provides runtime lookup of entity definitions and
/// relation descriptors. It is immutable after construction, so concurrent
/// readers need no locking.
#[derive(Debug, Default)]
pub struct RelationRegistry {
    /// Entity definitions by type name.
    entities: HashMap<String, EntityDef>,
    /// Relation descriptors by source type, in declaration order.
    relations: HashMap<String, Vec<RelationDescriptor>>,
}

impl RelationRegistry {
    /// Create a registry (use RegistryBuilder for construction).
    pub(crate) fn new(
        entities: HashMap<String, EntityDef>,
        relations: HashMap<String, Vec<RelationDescriptor>>,
    ) -> Self {
        Self {
            entities,
            relations,
        }
    }

    // ==================== Entity Lookups ====================

    /// Get an entity definition by type name.
    pub fn entity(&self, entity_type: &str) -> RegistryResult<&EntityDef> {
        self.entities
            .get(entity_type)
            .ok_or_else(|| RegistryError::UnknownEntity(entity_type.to_string()))
    }

    /// Get the number of entity types.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ==================== Relation Lookups ====================

    /// Resolve a relation by source type and relation name.
    pub fn resolve(&self, entity_type: &str, relation: &str) -> RegistryResult<&RelationDescriptor> {
        self.find(entity_type, relation)
            .ok_or_else(|| RegistryError::unknown_relation(entity_type, relation))
    }

    /// Find a relation, returning None when absent.
    pub fn find(&self, entity_type: &str, relation: &str) -> Option<&RelationDescriptor> {
        self.relations
            .get(entity_type)
            .and_then(|list| list.iter().find(|d| d.name == relation))
    }

    /// All relations declared on an entity type.
    pub fn relations_of(&self, entity_type: &str) -> &[RelationDescriptor] {
        self.relations
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The reverse-direction descriptor, if one was declared.
    ///
    /// PolymorphicTo relations have no single target type and therefore no
    /// inverse lookup.
    pub fn inverse(&self, descriptor: &RelationDescriptor) -> Option<&RelationDescriptor> {
        if descriptor.kind == RelationKind::PolymorphicTo {
            return None;
        }
        let inverse = descriptor.inverse_name.as_deref()?;
        self.find(&descriptor.target_type, inverse)
    }

    // ==================== Polymorphic Checks ====================

    /// Validate an asserted type tag against a polymorphic relation's allow-list.
    pub fn check_morph_type(
        &self,
        descriptor: &RelationDescriptor,
        type_tag: &str,
    ) -> RegistryResult<()> {
        let allowed = descriptor
            .morph
            .as_ref()
            .map(|m| m.allowed_types.iter().any(|t| t == type_tag))
            .unwrap_or(false);
        if allowed && self.entities.contains_key(type_tag) {
            Ok(())
        } else {
            Err(RegistryError::invalid_polymorphic_type(
                &descriptor.name,
                type_tag,
            ))
        }
    }
}
