//! Schema definition types.

use std::collections::BTreeSet;

/// How two entity types are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Parent has at most one child; child stores the foreign key.
    OneToOne,
    /// Parent has many children; children store the foreign key.
    OneToMany,
    /// Both sides linked through a pivot table.
    ManyToMany,
    /// Parent stores the foreign key of one related row.
    BelongsTo,
    /// Parent stores a foreign key plus a type tag naming the target type.
    PolymorphicTo,
    /// Parent has many children that point back with a key and a type tag.
    PolymorphicMany,
}

/// Which side of a relation stores the linking column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOwner {
    /// The parent row holds the foreign key; the related row is written first.
    Parent,
    /// The related rows hold the foreign key; the parent row is written first.
    Child,
    /// A pivot table holds both keys; written after both sides exist.
    Pivot,
}

impl RelationKind {
    /// Returns true if at most one related record exists per parent.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            RelationKind::OneToOne | RelationKind::BelongsTo | RelationKind::PolymorphicTo
        )
    }

    /// Returns true if the relation carries a type discriminator.
    pub fn is_polymorphic(&self) -> bool {
        matches!(
            self,
            RelationKind::PolymorphicTo | RelationKind::PolymorphicMany
        )
    }

    /// Which side stores the linking column.
    pub fn key_owner(&self) -> KeyOwner {
        match self {
            RelationKind::BelongsTo | RelationKind::PolymorphicTo => KeyOwner::Parent,
            RelationKind::OneToOne | RelationKind::OneToMany | RelationKind::PolymorphicMany => {
                KeyOwner::Child
            }
            RelationKind::ManyToMany => KeyOwner::Pivot,
        }
    }

    /// Returns the kind name.
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "OneToOne",
            RelationKind::OneToMany => "OneToMany",
            RelationKind::ManyToMany => "ManyToMany",
            RelationKind::BelongsTo => "BelongsTo",
            RelationKind::PolymorphicTo => "PolymorphicTo",
            RelationKind::PolymorphicMany => "PolymorphicMany",
        }
    }
}

/// Pivot table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotDef {
    /// Pivot table name.
    pub table: String,
    /// Pivot column holding the owner's key.
    pub owner_column: String,
    /// Pivot column holding the related row's key.
    pub related_column: String,
    /// Explicit ordering column; insertion order is used when absent.
    pub order_column: Option<String>,
}

impl PivotDef {
    pub fn new(
        table: impl Into<String>,
        owner_column: impl Into<String>,
        related_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            owner_column: owner_column.into(),
            related_column: related_column.into(),
            order_column: None,
        }
    }

    pub fn ordered_by(mut self, column: impl Into<String>) -> Self {
        self.order_column = Some(column.into());
        self
    }
}

/// Type discriminator of a polymorphic relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphDef {
    /// Column storing the type tag (on the parent for PolymorphicTo,
    /// on the children for PolymorphicMany).
    pub type_column: String,
    /// Entity types a PolymorphicTo relation may point at.
    pub allowed_types: Vec<String>,
}

/// Static metadata describing how two entity types are linked.
///
/// Column roles per kind:
/// - BelongsTo / PolymorphicTo: `owner_key` is the foreign key on the parent,
///   `related_key` the referenced column on the target.
/// - OneToOne / OneToMany / PolymorphicMany: `owner_key` is the referenced
///   column on the parent, `related_key` the foreign key on the children.
/// - ManyToMany: `owner_key` and `related_key` are the columns the pivot
///   columns point at on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Relation name (the field clients select).
    pub name: String,
    /// Entity type declaring the relation.
    pub source_type: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Column on the source side.
    pub owner_key: String,
    /// Column on the target side.
    pub related_key: String,
    /// Pivot table (ManyToMany only).
    pub pivot: Option<PivotDef>,
    /// Type discriminator (polymorphic kinds only).
    pub morph: Option<MorphDef>,
    /// Name of the reverse-direction relation on the target, if declared.
    pub inverse_name: Option<String>,
    /// Target entity type (an interface name for PolymorphicTo).
    pub target_type: String,
}

impl RelationDescriptor {
    /// Entity types this relation can resolve to.
    pub fn target_types(&self) -> Vec<&str> {
        match (&self.kind, &self.morph) {
            (RelationKind::PolymorphicTo, Some(morph)) => {
                morph.allowed_types.iter().map(String::as_str).collect()
            }
            _ => vec![self.target_type.as_str()],
        }
    }

    /// Which side stores the linking column.
    pub fn key_owner(&self) -> KeyOwner {
        self.kind.key_owner()
    }

    /// Returns true if at most one related record exists per parent.
    pub fn is_singular(&self) -> bool {
        self.kind.is_singular()
    }

    /// The type-tag column, for polymorphic relations.
    pub fn type_column(&self) -> Option<&str> {
        self.morph.as_ref().map(|m| m.type_column.as_str())
    }
}

/// An entity type and the table backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    /// Entity type name.
    pub name: String,
    /// Backing table.
    pub table: String,
    /// Primary key column.
    pub primary_key: String,
    /// All declared columns (including the primary key).
    pub columns: BTreeSet<String>,
}

impl EntityDef {
    /// Check if a column is declared.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }
}
