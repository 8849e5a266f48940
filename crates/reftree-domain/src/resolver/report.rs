//! Outcome of a resolution pass and resolver metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::ResolveWarning;
use crate::model::{Entity, EntityId};

/// What a call to `resolve()` did.
///
/// Resolution never fails as a whole; every local failure shows up here as
/// a warning.
#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    /// Root entities the walk started from, when the root step succeeded.
    pub root: Option<Arc<[Entity]>>,
    /// The root result came from the memo instead of a fetch.
    pub root_memo_hit: bool,
    /// Calls made to reference and side fetchers (root excluded).
    pub fetch_calls: usize,
    /// Entities written to the cache.
    pub entities_registered: usize,
    /// Ids newly recorded as failed.
    pub ids_marked_failed: usize,
    /// Ids obtained by waiting on another branch's in-flight fetch.
    pub in_flight_joins: usize,
    /// Warnings in the order they were raised within each branch.
    pub warnings: Vec<ResolveWarning>,
}

impl ResolveReport {
    /// Folds a branch report into this one.
    pub fn merge(&mut self, other: ResolveReport) {
        if self.root.is_none() {
            self.root = other.root;
        }
        self.root_memo_hit |= other.root_memo_hit;
        self.fetch_calls += other.fetch_calls;
        self.entities_registered += other.entities_registered;
        self.ids_marked_failed += other.ids_marked_failed;
        self.in_flight_joins += other.in_flight_joins;
        self.warnings.extend(other.warnings);
    }

    /// Logs a warning raised at `path` in the plan and records it.
    pub(crate) fn raise(&mut self, path: &str, warning: ResolveWarning) {
        match &warning {
            ResolveWarning::MissingRelation { relation, object } => warn!(
                path = %path,
                relation = %relation,
                object = object.as_ref().map_or("", EntityId::as_str),
                "{}",
                warning
            ),
            ResolveWarning::FetchRejected {
                origin,
                entity,
                reason,
            } => warn!(
                path = %path,
                origin = %origin,
                entity = %entity,
                error = %reason,
                "{}",
                warning
            ),
            _ => warn!(
                path = %path,
                entity = warning.entity().unwrap_or_default(),
                "{}",
                warning
            ),
        }
        self.warnings.push(warning);
    }

    /// Returns true when no warning was raised.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Metrics for resolver cache and fetch monitoring.
#[derive(Debug, Default)]
pub struct ResolverMetrics {
    /// Candidate ids served from the entity cache.
    pub cache_hits: AtomicU64,
    /// Candidate ids that needed a fetch.
    pub cache_misses: AtomicU64,
    /// Candidate ids dropped because they previously failed.
    pub failed_skips: AtomicU64,
    /// Calls made to reference and side fetchers.
    pub fetch_calls: AtomicU64,
    /// Ids newly recorded as failed.
    pub failed_ids: AtomicU64,
    /// Ids satisfied by another branch's in-flight fetch.
    pub in_flight_joins: AtomicU64,
    /// Root fetches served from the memo.
    pub root_memo_hits: AtomicU64,
    /// Root fetches actually issued.
    pub root_fetches: AtomicU64,
}

impl ResolverMetrics {
    /// Returns a snapshot of the current metrics.
    pub fn snapshot(&self) -> ResolverMetricsSnapshot {
        ResolverMetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            failed_skips: self.failed_skips.load(Ordering::Relaxed),
            fetch_calls: self.fetch_calls.load(Ordering::Relaxed),
            failed_ids: self.failed_ids.load(Ordering::Relaxed),
            in_flight_joins: self.in_flight_joins.load(Ordering::Relaxed),
            root_memo_hits: self.root_memo_hits.load(Ordering::Relaxed),
            root_fetches: self.root_fetches.load(Ordering::Relaxed),
        }
    }

    /// Returns the cache hit ratio (hits / (hits + misses)).
    /// Returns 0.0 if no hits or misses have occurred.
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of resolver metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverMetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failed_skips: u64,
    pub fetch_calls: u64,
    pub failed_ids: u64,
    pub in_flight_joins: u64,
    pub root_memo_hits: u64,
    pub root_fetches: u64,
}
