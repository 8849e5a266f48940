//! Cross-checking candidate ids against the cache and failed-id ledger.

use crate::cache::ReferenceStore;
use crate::model::{Entity, EntityId};

/// Candidate ids split by what the store already knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Ids that need a fetch, in candidate order.
    pub to_fetch: Vec<EntityId>,
    /// Copies of the entities already cached, in candidate order.
    pub already_fetched: Vec<Entity>,
    /// Ids dropped because an earlier fetch did not return them.
    pub skipped_failed: Vec<EntityId>,
}

/// Splits `ids` into cached entities and ids to fetch.
///
/// With `no_cache` every id is fetched, cached or failed alike. Otherwise a
/// cached id is served from the store, a failed id is dropped and anything
/// else is fetched.
pub fn partition(
    store: &ReferenceStore,
    entity_type: &str,
    ids: Vec<EntityId>,
    no_cache: bool,
) -> Partition {
    if no_cache {
        return Partition {
            to_fetch: ids,
            ..Default::default()
        };
    }

    let mut partition = Partition::default();
    for id in ids {
        if let Some(entity) = store.get(entity_type, &id) {
            partition.already_fetched.push(entity);
        } else if store.is_failed(entity_type, &id) {
            partition.skipped_failed.push(id);
        } else {
            partition.to_fetch.push(id);
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FailedIdScope;
    use serde_json::json;

    fn ids(values: &[&str]) -> Vec<EntityId> {
        values.iter().map(|v| EntityId::from(*v)).collect()
    }

    fn store_with_a1_cached_and_a2_failed() -> ReferenceStore {
        let store = ReferenceStore::new(FailedIdScope::Global);
        store.entities().register(
            "address",
            EntityId::from("a1"),
            Entity::from_value(json!({"id": "a1"})).unwrap(),
        );
        store.failed().mark_failed("address", &EntityId::from("a2"));
        store
    }

    #[test]
    fn test_cached_failed_and_unknown_ids_are_split() {
        let store = store_with_a1_cached_and_a2_failed();
        let result = partition(&store, "address", ids(&["a1", "a2", "a3"]), false);

        assert_eq!(result.to_fetch, ids(&["a3"]));
        assert_eq!(result.already_fetched.len(), 1);
        assert_eq!(result.already_fetched[0].id(), Some(EntityId::from("a1")));
        assert_eq!(result.skipped_failed, ids(&["a2"]));
    }

    #[test]
    fn test_no_cache_fetches_everything() {
        let store = store_with_a1_cached_and_a2_failed();
        let result = partition(&store, "address", ids(&["a1", "a2", "a3"]), true);

        assert_eq!(result.to_fetch, ids(&["a1", "a2", "a3"]));
        assert!(result.already_fetched.is_empty());
        assert!(result.skipped_failed.is_empty());
    }

    #[test]
    fn test_cache_lookup_is_per_entity_type() {
        let store = store_with_a1_cached_and_a2_failed();
        let result = partition(&store, "addresses", ids(&["a1"]), false);

        assert_eq!(result.to_fetch, ids(&["a1"]));
    }
}
