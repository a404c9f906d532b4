//! Relations whose foreign key lives on the node being written.

use tether_core::{Fields, RecordError, Related, Value};
use tether_registry::{EntityDef, RelationDescriptor, RelationKind, RelationRegistry};
use tether_store::Transaction;

use crate::classifier::SingularOp;
use crate::error::{MutationError, MutationResult};
use crate::executor::MutationExecutor;
use crate::input::RelationInput;

/// Resolve the related row and set the link columns on `row`.
pub(crate) fn apply(
    exec: &MutationExecutor<'_>,
    tx: &mut dyn Transaction,
    descriptor: &RelationDescriptor,
    input: &RelationInput,
    op: SingularOp<'_>,
    row: &mut Fields,
) -> MutationResult<Related> {
    let related = match op {
        SingularOp::SetNull => {
            row.insert(descriptor.owner_key.clone(), Value::Null);
            if let Some(column) = descriptor.type_column() {
                row.insert(column.to_string(), Value::Null);
            }
            return Ok(Related::One(None));
        }
        SingularOp::Create(child) => {
            let target = target_entity(exec.registry(), descriptor, input)?;
            exec.write_node(tx, target, None, child, &Fields::new())?
        }
        SingularOp::Connect(key) => {
            let target = target_entity(exec.registry(), descriptor, input)?;
            exec.require(tx, target, &descriptor.related_key, key)?
        }
        SingularOp::Update(key, child) => {
            let target = target_entity(exec.registry(), descriptor, input)?;
            let current = exec.require(tx, target, &descriptor.related_key, key)?;
            exec.write_node(tx, target, Some(&current.key), child, &Fields::new())?
        }
    };

    let link = related
        .get(&descriptor.related_key)
        .cloned()
        .ok_or_else(|| RecordError::missing_key(&related.entity_type, &descriptor.related_key))?;
    row.insert(descriptor.owner_key.clone(), link);
    // Key and type tag are always written together.
    if let Some(column) = descriptor.type_column() {
        row.insert(column.to_string(), Value::from(related.entity_type.as_str()));
    }
    Ok(Related::One(Some(Box::new(related))))
}

/// The entity a parent-owned relation points at.
///
/// PolymorphicTo relations take it from the input's asserted type tag,
/// which must be one of the relation's declared targets.
fn target_entity<'r>(
    registry: &'r RelationRegistry,
    descriptor: &RelationDescriptor,
    input: &RelationInput,
) -> MutationResult<&'r EntityDef> {
    if descriptor.kind != RelationKind::PolymorphicTo {
        return Ok(registry.entity(&descriptor.target_type)?);
    }
    let type_tag = input
        .morph_type
        .as_deref()
        .ok_or_else(|| MutationError::missing_polymorphic_type(&descriptor.name))?;
    registry.check_morph_type(descriptor, type_tag)?;
    Ok(registry.entity(type_tag)?)
}
