//! Configuration for the reference resolver.

use crate::cache::FailedIdScope;

/// Configuration for the reference resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Share in-flight fetches between concurrent branches.
    ///
    /// When enabled, a cache-aware branch that needs an id another branch
    /// is already fetching waits for that fetch instead of issuing its own.
    pub dedup_in_flight: bool,
    /// Maximum number of per-id calls in flight for one non-batch node.
    pub max_concurrent_fetches: usize,
    /// How failed ids are keyed. Only used when the resolver creates its
    /// own store.
    pub failed_id_scope: FailedIdScope,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dedup_in_flight: true,
            max_concurrent_fetches: 32,
            failed_id_scope: FailedIdScope::Global,
        }
    }
}

impl ResolverConfig {
    /// Enables or disables in-flight request sharing.
    pub fn with_dedup_in_flight(mut self, enabled: bool) -> Self {
        self.dedup_in_flight = enabled;
        self
    }

    /// Sets the per-node fan-out limit. Zero is treated as one.
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// Sets the failed-id scope.
    pub fn with_failed_id_scope(mut self, scope: FailedIdScope) -> Self {
        self.failed_id_scope = scope;
        self
    }
}
