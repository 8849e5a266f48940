//! Relation id extraction from parent objects.

use std::collections::HashSet;

use crate::error::ResolveWarning;
use crate::model::{Entity, EntityId, RelationValue};

/// Ids referenced by a parent set, plus the warnings raised reading them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedIds {
    /// Unique ids in first-seen order.
    pub ids: Vec<EntityId>,
    /// One warning per required relation that was missing.
    pub warnings: Vec<ResolveWarning>,
}

/// Collects the unique ids found under `relation` across `parents`.
///
/// A parent without the relation contributes nothing. Unless `optional` is
/// set, each such parent also yields a [`ResolveWarning::MissingRelation`].
pub fn extract_ids(parents: &[Entity], relation: &str, optional: bool) -> ExtractedIds {
    let mut seen = HashSet::new();
    let mut extracted = ExtractedIds::default();

    for parent in parents {
        match parent.relation(relation) {
            RelationValue::Id(id) => {
                if seen.insert(id.clone()) {
                    extracted.ids.push(id);
                }
            }
            RelationValue::Missing if optional => {}
            RelationValue::Missing => {
                extracted.warnings.push(ResolveWarning::MissingRelation {
                    relation: relation.to_string(),
                    object: parent.id(),
                });
            }
        }
    }

    extracted
}

/// Unique `id` values of a result set, in first-seen order.
pub fn own_ids(entities: &[Entity]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .filter_map(Entity::id)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
