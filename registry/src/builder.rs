//! RegistryBuilder for constructing an immutable RelationRegistry.

use crate::{
    EntityDef, KeyOwner, MorphDef, PivotDef, RegistryError, RegistryResult, RelationDescriptor,
    RelationKind, RelationRegistry,
};
use regex_lite::Regex;
use std::collections::{BTreeSet, HashMap};

/// Names, tables and columns must match this pattern.
const IDENTIFIER: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// A relation declared on the builder, resolved at `build()`.
#[derive(Debug, Clone)]
struct PendingRelation {
    source_type: String,
    name: String,
    kind: RelationKind,
    target_type: String,
    owner_key: Option<String>,
    related_key: Option<String>,
    pivot: Option<PivotDef>,
    morph: Option<MorphDef>,
    inverse_name: Option<String>,
}

/// Builder for constructing an immutable RelationRegistry.
///
/// Entities and relations may be declared in any order; every cross
/// reference is checked once in `build()`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Entities being built.
    entities: HashMap<String, EntityDef>,
    /// Relations being built, in declaration order.
    relations: Vec<PendingRelation>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type backed by `table`.
    pub fn add_entity(
        &mut self,
        name: impl Into<String>,
        table: impl Into<String>,
    ) -> EntityBuilder<'_> {
        EntityBuilder {
            builder: self,
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            columns: BTreeSet::new(),
        }
    }

    /// Add a relation named `name` from `source_type` to `target_type`.
    pub fn add_relation(
        &mut self,
        source_type: impl Into<String>,
        name: impl Into<String>,
        kind: RelationKind,
        target_type: impl Into<String>,
    ) -> RelationBuilder<'_> {
        RelationBuilder {
            builder: self,
            pending: PendingRelation {
                source_type: source_type.into(),
                name: name.into(),
                kind,
                target_type: target_type.into(),
                owner_key: None,
                related_key: None,
                pivot: None,
                morph: None,
                inverse_name: None,
            },
        }
    }

    /// Build the immutable RelationRegistry.
    pub fn build(self) -> RegistryResult<RelationRegistry> {
        let ident = Regex::new(IDENTIFIER).map_err(|e| RegistryError::Pattern(e.to_string()))?;
        let RegistryBuilder {
            entities,
            relations: pending,
        } = self;

        for entity in entities.values() {
            check_identifier(&ident, &entity.name)?;
            check_identifier(&ident, &entity.table)?;
            for column in &entity.columns {
                check_identifier(&ident, column)?;
            }
        }

        let mut relations: HashMap<String, Vec<RelationDescriptor>> = HashMap::new();
        for relation in pending {
            let descriptor = resolve_relation(&entities, &ident, relation)?;
            relations
                .entry(descriptor.source_type.clone())
                .or_default()
                .push(descriptor);
        }

        for list in relations.values() {
            for descriptor in list {
                validate_inverse(&relations, descriptor)?;
            }
        }

        Ok(RelationRegistry::new(entities, relations))
    }
}

/// Builder for an entity definition.
pub struct EntityBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    name: String,
    table: String,
    primary_key: String,
    columns: BTreeSet<String>,
}

impl<'a> EntityBuilder<'a> {
    /// Set the primary key column (defaults to "id").
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Declare columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Finish building this entity.
    pub fn done(mut self) -> RegistryResult<()> {
        if self.builder.entities.contains_key(&self.name) {
            return Err(RegistryError::DuplicateEntity(self.name));
        }

        self.columns.insert(self.primary_key.clone());
        let entity = EntityDef {
            name: self.name.clone(),
            table: self.table,
            primary_key: self.primary_key,
            columns: self.columns,
        };
        self.builder.entities.insert(self.name, entity);

        Ok(())
    }
}

/// Builder for a relation descriptor.
pub struct RelationBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    pending: PendingRelation,
}

impl<'a> RelationBuilder<'a> {
    /// Set the source-side column.
    pub fn owner_key(mut self, column: impl Into<String>) -> Self {
        self.pending.owner_key = Some(column.into());
        self
    }

    /// Set the target-side column.
    pub fn related_key(mut self, column: impl Into<String>) -> Self {
        self.pending.related_key = Some(column.into());
        self
    }

    /// Set the pivot table (ManyToMany).
    pub fn pivot(mut self, pivot: PivotDef) -> Self {
        self.pending.pivot = Some(pivot);
        self
    }

    /// Set the type discriminator column and, for PolymorphicTo, the allowed targets.
    pub fn morph<I, S>(mut self, type_column: impl Into<String>, allowed_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.morph = Some(MorphDef {
            type_column: type_column.into(),
            allowed_types: allowed_types.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Name the reverse-direction relation on the target.
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        self.pending.inverse_name = Some(name.into());
        self
    }

    /// Finish building this relation.
    pub fn done(self) -> RegistryResult<()> {
        let duplicate = self.builder.relations.iter().any(|r| {
            r.source_type == self.pending.source_type && r.name == self.pending.name
        });
        if duplicate {
            return Err(RegistryError::duplicate_relation(
                &self.pending.source_type,
                &self.pending.name,
            ));
        }

        self.builder.relations.push(self.pending);
        Ok(())
    }
}

// ==================== Validation ====================

fn check_identifier(ident: &Regex, name: &str) -> RegistryResult<()> {
    if ident.is_match(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidIdentifier(name.to_string()))
    }
}

fn lookup<'e>(entities: &'e HashMap<String, EntityDef>, name: &str) -> RegistryResult<&'e EntityDef> {
    entities
        .get(name)
        .ok_or_else(|| RegistryError::UnknownEntity(name.to_string()))
}

fn require_column(entity: &EntityDef, relation: &str, column: &str) -> RegistryResult<()> {
    if entity.has_column(column) {
        Ok(())
    } else {
        Err(RegistryError::unknown_column(relation, &entity.name, column))
    }
}

/// Resolve default keys and check every column a relation references.
fn resolve_relation(
    entities: &HashMap<String, EntityDef>,
    ident: &Regex,
    pending: PendingRelation,
) -> RegistryResult<RelationDescriptor> {
    check_identifier(ident, &pending.name)?;
    let source = lookup(entities, &pending.source_type)?;

    let targets: Vec<&EntityDef> = if pending.kind == RelationKind::PolymorphicTo {
        let morph = pending
            .morph
            .as_ref()
            .filter(|m| !m.allowed_types.is_empty())
            .ok_or_else(|| RegistryError::MissingMorph {
                relation: pending.name.clone(),
            })?;
        morph
            .allowed_types
            .iter()
            .map(|t| lookup(entities, t))
            .collect::<RegistryResult<_>>()?
    } else {
        vec![lookup(entities, &pending.target_type)?]
    };
    // Every target exists, so the first one is present.
    let first_target_pk = targets
        .first()
        .map(|t| t.primary_key.clone())
        .unwrap_or_default();

    let (owner_key, related_key) = match pending.kind.key_owner() {
        KeyOwner::Parent => {
            let owner_key = pending
                .owner_key
                .clone()
                .ok_or_else(|| RegistryError::MissingForeignKey {
                    relation: pending.name.clone(),
                })?;
            let related_key = pending.related_key.clone().unwrap_or(first_target_pk);
            (owner_key, related_key)
        }
        KeyOwner::Child => {
            let related_key =
                pending
                    .related_key
                    .clone()
                    .ok_or_else(|| RegistryError::MissingForeignKey {
                        relation: pending.name.clone(),
                    })?;
            let owner_key = pending
                .owner_key
                .clone()
                .unwrap_or_else(|| source.primary_key.clone());
            (owner_key, related_key)
        }
        KeyOwner::Pivot => {
            let pivot = pending
                .pivot
                .as_ref()
                .ok_or_else(|| RegistryError::MissingPivot {
                    relation: pending.name.clone(),
                })?;
            check_identifier(ident, &pivot.table)?;
            check_identifier(ident, &pivot.owner_column)?;
            check_identifier(ident, &pivot.related_column)?;
            if let Some(order) = &pivot.order_column {
                check_identifier(ident, order)?;
            }
            let owner_key = pending
                .owner_key
                .clone()
                .unwrap_or_else(|| source.primary_key.clone());
            let related_key = pending.related_key.clone().unwrap_or(first_target_pk);
            (owner_key, related_key)
        }
    };

    require_column(source, &pending.name, &owner_key)?;
    for target in &targets {
        require_column(target, &pending.name, &related_key)?;
    }

    match pending.kind {
        RelationKind::PolymorphicTo => {
            if let Some(morph) = &pending.morph {
                require_column(source, &pending.name, &morph.type_column)?;
            }
        }
        RelationKind::PolymorphicMany => {
            let morph = pending
                .morph
                .as_ref()
                .ok_or_else(|| RegistryError::MissingMorph {
                    relation: pending.name.clone(),
                })?;
            for target in &targets {
                require_column(target, &pending.name, &morph.type_column)?;
            }
        }
        _ => {}
    }

    Ok(RelationDescriptor {
        name: pending.name,
        source_type: pending.source_type,
        kind: pending.kind,
        owner_key,
        related_key,
        pivot: pending.pivot,
        morph: pending.morph,
        inverse_name: pending.inverse_name,
        target_type: pending.target_type,
    })
}

/// Check that a declared inverse exists, points back, and does not also own the key.
fn validate_inverse(
    relations: &HashMap<String, Vec<RelationDescriptor>>,
    descriptor: &RelationDescriptor,
) -> RegistryResult<()> {
    let Some(inverse_name) = &descriptor.inverse_name else {
        return Ok(());
    };

    for target in descriptor.target_types() {
        let inverse = relations
            .get(target)
            .and_then(|list| list.iter().find(|d| &d.name == inverse_name))
            .ok_or_else(|| RegistryError::unknown_inverse(&descriptor.name, inverse_name))?;

        if !inverse.target_types().contains(&descriptor.source_type.as_str()) {
            return Err(RegistryError::inverse_mismatch(&descriptor.name, inverse_name));
        }

        match (descriptor.key_owner(), inverse.key_owner()) {
            (KeyOwner::Parent, KeyOwner::Parent) => {
                return Err(RegistryError::conflicting_ownership(
                    &descriptor.name,
                    inverse_name,
                ));
            }
            (KeyOwner::Parent, KeyOwner::Child)
            | (KeyOwner::Child, KeyOwner::Parent)
            | (KeyOwner::Pivot, KeyOwner::Pivot) => {}
            _ => {
                return Err(RegistryError::inverse_mismatch(&descriptor.name, inverse_name));
            }
        }
    }

    Ok(())
}
