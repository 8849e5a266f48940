//! The reference tree walker and root orchestration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, trace};

use super::config::ResolverConfig;
use super::context::WalkContext;
use super::dispatch::{DispatchRequest, FetchDispatcher};
use super::extract::{extract_ids, own_ids};
use super::partition::{partition, Partition};
use super::report::{ResolveReport, ResolverMetrics};
use super::singleflight::InFlight;
use super::traits::Fetched;
use crate::cache::ReferenceStore;
use crate::error::{FetchOrigin, ResolveWarning};
use crate::model::{Entity, EntityId, PlanNode, RootPlan, SidePlan};

/// Type alias for boxed futures used in recursive async functions.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves plans of entity references into a shared [`ReferenceStore`].
///
/// One resolver is meant to live for the whole process. Its store
/// remembers every entity fetched, every id a fetch failed to return and
/// every root result, so later passes only fetch what is new.
///
/// The resolver is `Sync`; concurrent `resolve()` calls on the same
/// instance share the store and, when enabled, each other's in-flight
/// fetches.
pub struct ReferenceResolver {
    store: Arc<ReferenceStore>,
    config: ResolverConfig,
    in_flight: InFlight,
    metrics: ResolverMetrics,
}

impl ReferenceResolver {
    /// Creates a resolver with default configuration and a fresh store.
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    /// Creates a resolver with a fresh store scoped per `config`.
    pub fn with_config(config: ResolverConfig) -> Self {
        let store = Arc::new(ReferenceStore::new(config.failed_id_scope));
        Self::with_store(store, config)
    }

    /// Creates a resolver writing into an existing store.
    ///
    /// The store keeps its own failed-id scope; `config.failed_id_scope`
    /// is ignored here.
    pub fn with_store(store: Arc<ReferenceStore>, config: ResolverConfig) -> Self {
        Self {
            store,
            config,
            in_flight: InFlight::new(),
            metrics: ResolverMetrics::default(),
        }
    }

    pub fn store(&self) -> &Arc<ReferenceStore> {
        &self.store
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns a reference to the resolver metrics.
    pub fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }

    /// Resolves a plan: root fetch (or memo), then every reference and
    /// side branch below it.
    ///
    /// Returns once every branch has settled. Never fails; problems are
    /// logged and collected in the returned report.
    pub async fn resolve(&self, plan: &RootPlan) -> ResolveReport {
        let ctx = WalkContext::root(&plan.entity);
        let mut report = ResolveReport::default();

        let Some(fetcher) = plan.fetch.as_deref() else {
            report.raise(
                &ctx.path,
                ResolveWarning::MissingFetcher {
                    origin: FetchOrigin::Root,
                    entity: plan.entity.clone(),
                },
            );
            return report;
        };

        let memoised = if plan.root_no_cache {
            None
        } else {
            self.store.root_result(&plan.identity)
        };

        let roots = match memoised {
            Some(roots) => {
                debug!(identity = %plan.identity, entity = %plan.entity, "root memo hit");
                report.root_memo_hit = true;
                ResolverMetrics::add(&self.metrics.root_memo_hits, 1);
                metrics::counter!("reftree_root_memo_hits_total").increment(1);
                roots
            }
            None => {
                debug!(identity = %plan.identity, entity = %plan.entity, "fetching root");
                ResolverMetrics::add(&self.metrics.root_fetches, 1);

                match fetcher.fetch().await {
                    Ok(Fetched::Nothing) => {
                        report.raise(
                            &ctx.path,
                            ResolveWarning::EmptyResult {
                                origin: FetchOrigin::Root,
                                entity: plan.entity.clone(),
                            },
                        );
                        return report;
                    }
                    Ok(result) => {
                        let roots: Arc<[Entity]> = result.into_entities().into();
                        self.store
                            .root_calls()
                            .store(plan.identity.clone(), Arc::clone(&roots));
                        roots
                    }
                    Err(err) => {
                        report.raise(
                            &ctx.path,
                            ResolveWarning::FetchRejected {
                                origin: FetchOrigin::Root,
                                entity: plan.entity.clone(),
                                reason: err.to_string(),
                            },
                        );
                        return report;
                    }
                }
            }
        };

        report.root = Some(Arc::clone(&roots));
        let branches = self
            .visit_children(roots, &plan.refs, &plan.sides, &ctx)
            .await;
        report.merge(branches);
        report
    }

    /// Walks the reference nodes and side fetches hanging off a result set.
    ///
    /// Siblings run concurrently in the current task; sides run alongside
    /// the reference walk.
    async fn visit_children(
        &self,
        parents: Arc<[Entity]>,
        refs: &[PlanNode],
        sides: &[SidePlan],
        ctx: &WalkContext,
    ) -> ResolveReport {
        let mut report = ResolveReport::default();
        if refs.is_empty() && sides.is_empty() {
            return report;
        }

        let branches = join_all(
            refs.iter()
                .map(|node| self.visit_node(node, Arc::clone(&parents), ctx.child(&node.entity))),
        );
        let side_fetches = join_all(
            sides
                .iter()
                .map(|side| self.run_side(side, &parents, ctx.child(&side.entity))),
        );

        let (branch_reports, side_reports) = futures::join!(branches, side_fetches);
        for branch in branch_reports.into_iter().chain(side_reports) {
            report.merge(branch);
        }
        report
    }

    /// Resolves one reference node against its parents, then recurses.
    fn visit_node<'a>(
        &'a self,
        node: &'a PlanNode,
        parents: Arc<[Entity]>,
        ctx: WalkContext,
    ) -> BoxFuture<'a, ResolveReport> {
        Box::pin(async move {
            let mut report = ResolveReport::default();

            let extracted = extract_ids(&parents, node.relation(), node.optional);
            for warning in extracted.warnings {
                report.raise(&ctx.path, warning);
            }

            let Partition {
                to_fetch,
                already_fetched,
                ..
            } = self.cross_check(&node.entity, extracted.ids, node.no_cache, &ctx);

            let results: Arc<[Entity]> = if to_fetch.is_empty() {
                already_fetched.into()
            } else if let Some(fetcher) = node.fetch.as_deref() {
                let dispatched = self
                    .dispatcher(&ctx)
                    .run(DispatchRequest {
                        origin: FetchOrigin::Reference,
                        entity: &node.entity,
                        fetcher,
                        ids: to_fetch,
                        batch: node.batch,
                        no_cache: node.no_cache,
                    })
                    .await;
                report.merge(dispatched.report);

                let mut results = dispatched.entities;
                results.extend(already_fetched);
                results.into()
            } else {
                report.raise(
                    &ctx.path,
                    ResolveWarning::MissingFetcher {
                        origin: FetchOrigin::Reference,
                        entity: node.entity.clone(),
                    },
                );
                already_fetched.into()
            };

            trace!(path = %ctx.path, depth = ctx.depth, results = results.len(), "node settled");

            let children = self
                .visit_children(results, &node.refs, &node.sides, &ctx)
                .await;
            report.merge(children);
            report
        })
    }

    /// Fetches a side entity for the ids of a result set. Sides are always
    /// batch and cache-aware, and never recurse.
    async fn run_side(
        &self,
        side: &SidePlan,
        parents: &[Entity],
        ctx: WalkContext,
    ) -> ResolveReport {
        let mut report = ResolveReport::default();

        let Some(fetcher) = side.fetch.as_deref() else {
            report.raise(
                &ctx.path,
                ResolveWarning::MissingFetcher {
                    origin: FetchOrigin::Side,
                    entity: side.entity.clone(),
                },
            );
            return report;
        };

        let ids = own_ids(parents);
        let Partition { to_fetch, .. } = self.cross_check(&side.entity, ids, false, &ctx);
        if to_fetch.is_empty() {
            return report;
        }

        let dispatched = self
            .dispatcher(&ctx)
            .run(DispatchRequest {
                origin: FetchOrigin::Side,
                entity: &side.entity,
                fetcher,
                ids: to_fetch,
                batch: true,
                no_cache: false,
            })
            .await;
        report.merge(dispatched.report);
        report
    }

    /// Partitions candidate ids and records the cache decision.
    fn cross_check(
        &self,
        entity: &str,
        ids: Vec<EntityId>,
        no_cache: bool,
        ctx: &WalkContext,
    ) -> Partition {
        let partition = partition(&self.store, entity, ids, no_cache);

        ResolverMetrics::add(&self.metrics.cache_hits, partition.already_fetched.len());
        ResolverMetrics::add(&self.metrics.cache_misses, partition.to_fetch.len());
        ResolverMetrics::add(&self.metrics.failed_skips, partition.skipped_failed.len());
        metrics::counter!("reftree_entity_cache_hits_total")
            .increment(partition.already_fetched.len() as u64);
        metrics::counter!("reftree_entity_cache_misses_total")
            .increment(partition.to_fetch.len() as u64);

        debug!(
            path = %ctx.path,
            entity = %entity,
            to_fetch = partition.to_fetch.len(),
            cached = partition.already_fetched.len(),
            skipped_failed = partition.skipped_failed.len(),
            no_cache,
            "cache cross-check"
        );
        partition
    }

    fn dispatcher<'a>(&'a self, ctx: &'a WalkContext) -> FetchDispatcher<'a> {
        let in_flight = self.config.dedup_in_flight.then_some(&self.in_flight);
        FetchDispatcher::new(
            &self.store,
            in_flight,
            &self.metrics,
            self.config.max_concurrent_fetches,
            &ctx.path,
        )
    }
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("config", &self.config)
            .field("entities", &self.store.entities().len())
            .field("failed_ids", &self.store.failed().len())
            .finish_non_exhaustive()
    }
}
