//! Process-wide resolution state.
//!
//! This module holds everything the resolver remembers between calls:
//!
//! - [`EntityCache`]: `entity type -> (id -> entity snapshot)`
//! - [`FailedIdSet`]: ids a completed fetch did not return
//! - [`RootCallMemo`]: last root result per [`CallIdentity`](crate::model::CallIdentity)
//!
//! [`ReferenceStore`] bundles the three so one store can be constructed
//! once and handed to any number of resolvers.
//!
//! # Write Policy
//!
//! Writes are append-or-ignore: a registered entity is never overwritten
//! by a cache-aware fetch and nothing is ever evicted. The only replacing
//! writes are a `noCache` refresh of an entity and a forced root refetch.
//! Concurrent branches may therefore fetch the same id twice, but can never
//! corrupt what is stored.
//!
//! # Thread Safety
//!
//! All maps are `DashMap`/`DashSet`, so a store can be shared across tasks
//! behind an `Arc` without external synchronization.

mod entities;
mod failed;
mod memo;

pub use entities::{EntityCache, EntityKey};
pub use failed::{FailedIdScope, FailedIdSet};
pub use memo::RootCallMemo;

use std::sync::Arc;

use crate::model::{CallIdentity, Entity, EntityId};

/// Entity cache, failed-id ledger and root memo of one resolver instance.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    entities: EntityCache,
    failed: FailedIdSet,
    root_calls: RootCallMemo,
}

impl ReferenceStore {
    /// Creates an empty store with the given failed-id scope.
    pub fn new(scope: FailedIdScope) -> Self {
        Self {
            entities: EntityCache::new(),
            failed: FailedIdSet::new(scope),
            root_calls: RootCallMemo::new(),
        }
    }

    pub fn entities(&self) -> &EntityCache {
        &self.entities
    }

    pub fn failed(&self) -> &FailedIdSet {
        &self.failed
    }

    pub fn root_calls(&self) -> &RootCallMemo {
        &self.root_calls
    }

    /// Returns a copy of a resolved entity.
    pub fn get(&self, entity_type: &str, id: &EntityId) -> Option<Entity> {
        self.entities.get(entity_type, id)
    }

    /// Returns copies of every resolved entity of a type.
    pub fn entities_of_type(&self, entity_type: &str) -> Vec<Entity> {
        self.entities.entities_of_type(entity_type)
    }

    /// Returns true if the id is suppressed for the entity type.
    pub fn is_failed(&self, entity_type: &str, id: &EntityId) -> bool {
        self.failed.is_failed(entity_type, id)
    }

    /// Returns the memoised root result for an identity.
    pub fn root_result(&self, identity: &CallIdentity) -> Option<Arc<[Entity]>> {
        self.root_calls.get(identity)
    }
}

/// Registers resolver metric descriptions.
///
/// Call this function once during application startup to register metric
/// descriptions with the metrics recorder. This is optional but provides
/// better documentation in Prometheus/Grafana.
///
/// # Metrics Registered
///
/// - `reftree_entity_cache_hits_total` - Candidate ids served from the entity cache
/// - `reftree_entity_cache_misses_total` - Candidate ids that needed a fetch
/// - `reftree_fetch_calls_total` - Calls made to reference and side fetchers
/// - `reftree_failed_ids_total` - Ids recorded as failed
/// - `reftree_root_memo_hits_total` - Root fetches served from the memo
pub fn register_resolver_metrics() {
    metrics::describe_counter!(
        "reftree_entity_cache_hits_total",
        "Total number of entity cache hits"
    );
    metrics::describe_counter!(
        "reftree_entity_cache_misses_total",
        "Total number of entity cache misses"
    );
    metrics::describe_counter!(
        "reftree_fetch_calls_total",
        "Total number of calls made to reference and side fetchers"
    );
    metrics::describe_counter!(
        "reftree_failed_ids_total",
        "Total number of ids recorded as failed"
    );
    metrics::describe_counter!(
        "reftree_root_memo_hits_total",
        "Total number of root fetches served from the memo"
    );
}
