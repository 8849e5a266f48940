//! Reference resolver for thin API responses.
//!
//! The resolver walks a [`RootPlan`](crate::model::RootPlan): it fetches
//! (or recalls) the root entities, reads the relation ids each child node
//! names from its parents, fetches whatever the store does not know yet
//! and recurses with the combined result set.
//!
//! # Architecture Decisions
//!
//! - **Concurrency**: sibling nodes and side fetches are driven with
//!   `join_all` inside the caller's task; nothing is spawned. Per-id fetch
//!   fan-out for non-batch nodes goes through `buffer_unordered`, bounded by
//!   `max_concurrent_fetches`.
//!
//! - **Failure Isolation**: a rejected or empty fetch is a warning on the
//!   report, never an error. The failing branch continues with zero new
//!   results; its siblings are unaffected.
//!
//! - **Failed Ids**: only a fetch that completed without returning an id
//!   marks that id failed. Failed ids are skipped by later passes unless
//!   the node sets `no_cache`.
//!
//! - **In-Flight Dedup**: cache-aware fetches claim each `(entity, id)`
//!   before fetching. A branch needing an id another branch is already
//!   fetching waits for that outcome instead of fetching it again.
//!
//! - **Recursion**: the walk boxes its futures; plan depth is bounded only
//!   by the plan itself, which is finite.

mod config;
mod context;
mod dispatch;
mod extract;
mod partition;
mod reference_resolver;
mod report;
mod singleflight;
mod traits;

#[cfg(test)]
mod tests;

pub use config::ResolverConfig;
pub use extract::{extract_ids, own_ids, ExtractedIds};
pub use partition::{partition, Partition};
pub use reference_resolver::ReferenceResolver;
pub use report::{ResolveReport, ResolverMetrics, ResolverMetricsSnapshot};
pub use traits::{FetchRequest, Fetched, RefFetcher, RootFetcher};
