//! Ledger of ids whose fetch completed without yielding them.

use std::str::FromStr;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

use crate::model::EntityId;

/// How failed ids are keyed.
///
/// `Global` keys by raw id only: a failure recorded for one entity type also
/// suppresses fetches of the same id for every other type. `PerEntityType`
/// keys by `(entity type, id)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedIdScope {
    #[default]
    Global,
    PerEntityType,
}

impl FromStr for FailedIdScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "global" => Ok(FailedIdScope::Global),
            "per_entity_type" => Ok(FailedIdScope::PerEntityType),
            other => Err(format!(
                "unknown failed id scope '{}', expected 'global' or 'per_entity_type'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FailedKey {
    entity_type: Option<String>,
    id: EntityId,
}

/// Set of ids that a completed fetch did not return.
///
/// Ids in this set are skipped by cache-aware fetches for the rest of the
/// process lifetime. Only `noCache` nodes request them again.
#[derive(Debug, Default)]
pub struct FailedIdSet {
    scope: FailedIdScope,
    ids: DashSet<FailedKey>,
}

impl FailedIdSet {
    pub fn new(scope: FailedIdScope) -> Self {
        Self {
            scope,
            ids: DashSet::new(),
        }
    }

    pub fn scope(&self) -> FailedIdScope {
        self.scope
    }

    fn key(&self, entity_type: &str, id: &EntityId) -> FailedKey {
        FailedKey {
            entity_type: match self.scope {
                FailedIdScope::Global => None,
                FailedIdScope::PerEntityType => Some(entity_type.to_string()),
            },
            id: id.clone(),
        }
    }

    /// Records a failed id. Returns true if it was not already recorded.
    pub fn mark_failed(&self, entity_type: &str, id: &EntityId) -> bool {
        let newly_marked = self.ids.insert(self.key(entity_type, id));
        if newly_marked {
            metrics::counter!("reftree_failed_ids_total").increment(1);
        }
        newly_marked
    }

    pub fn is_failed(&self, entity_type: &str, id: &EntityId) -> bool {
        self.ids.contains(&self.key(entity_type, id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
