//! Entity snapshots keyed by `(entity type, id)`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::model::{Entity, EntityId};

/// Cache key identifying one entity of one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// The entity type name (e.g., "address").
    pub entity_type: String,
    /// The entity id.
    pub id: EntityId,
}

impl EntityKey {
    /// Creates a new entity key.
    pub fn new(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

/// Flat, deduplicated store of resolved entities.
///
/// Entries are never evicted. `register` keeps the first snapshot written
/// for a key; only `refresh` (used for `noCache` fetches) replaces one.
#[derive(Debug, Default)]
pub struct EntityCache {
    entries: DashMap<EntityKey, Entity>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached entity, if any.
    ///
    /// Lookups are not counted here; the resolver records hits and misses
    /// once per candidate id when it cross-checks a node.
    pub fn get(&self, entity_type: &str, id: &EntityId) -> Option<Entity> {
        self.entries
            .get(&EntityKey::new(entity_type, id.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Returns true if an entity is cached for the key.
    pub fn contains(&self, entity_type: &str, id: &EntityId) -> bool {
        self.entries
            .contains_key(&EntityKey::new(entity_type, id.clone()))
    }

    /// Inserts an entity unless one is already cached for the key.
    ///
    /// Returns true if the entity was inserted.
    pub fn register(&self, entity_type: &str, id: EntityId, value: Entity) -> bool {
        match self.entries.entry(EntityKey::new(entity_type, id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Inserts or replaces the cached entity for the key.
    pub fn refresh(&self, entity_type: &str, id: EntityId, value: Entity) {
        self.entries.insert(EntityKey::new(entity_type, id), value);
    }

    /// Returns copies of every cached entity of a type, in no particular order.
    pub fn entities_of_type(&self, entity_type: &str) -> Vec<Entity> {
        self.entries
            .iter()
            .filter(|entry| entry.key().entity_type == entity_type)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns the number of cached entities across all types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
