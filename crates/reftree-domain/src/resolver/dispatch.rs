//! Issuing reference fetches and registering what they return.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use tracing::{debug, trace};

use super::report::{ResolveReport, ResolverMetrics};
use super::singleflight::{FlightGuard, FlightSlot, InFlight};
use super::traits::{FetchRequest, Fetched, RefFetcher};
use crate::cache::{EntityKey, ReferenceStore};
use crate::error::{FetchOrigin, FetchResult, ResolveWarning};
use crate::model::{Entity, EntityId};

/// One node's worth of ids to fetch.
pub(crate) struct DispatchRequest<'a> {
    pub(crate) origin: FetchOrigin,
    pub(crate) entity: &'a str,
    pub(crate) fetcher: &'a dyn RefFetcher,
    pub(crate) ids: Vec<EntityId>,
    pub(crate) batch: bool,
    pub(crate) no_cache: bool,
}

/// Entities obtained for a dispatch, plus what happened along the way.
#[derive(Debug, Default)]
pub(crate) struct Dispatched {
    pub(crate) entities: Vec<Entity>,
    pub(crate) report: ResolveReport,
}

/// A completed fetcher call: the ids it asked for and its outcome.
type Settled = (Vec<EntityId>, FetchResult<Fetched>);

/// Runs fetcher calls for one node against a shared store.
pub(crate) struct FetchDispatcher<'a> {
    store: &'a ReferenceStore,
    in_flight: Option<&'a InFlight>,
    metrics: &'a ResolverMetrics,
    max_concurrent: usize,
    path: &'a str,
}

impl<'a> FetchDispatcher<'a> {
    pub(crate) fn new(
        store: &'a ReferenceStore,
        in_flight: Option<&'a InFlight>,
        metrics: &'a ResolverMetrics,
        max_concurrent: usize,
        path: &'a str,
    ) -> Self {
        Self {
            store,
            in_flight,
            metrics,
            max_concurrent: max_concurrent.max(1),
            path,
        }
    }

    /// Fetches `request.ids`, registers the results and marks the ids that
    /// a completed call did not return as failed.
    ///
    /// A cache-aware request first claims each id. Ids another branch is
    /// already fetching are awaited instead of fetched, after this
    /// dispatcher's own calls have settled and been published.
    pub(crate) async fn run(&self, request: DispatchRequest<'_>) -> Dispatched {
        let mut dispatched = Dispatched::default();
        if request.ids.is_empty() {
            return dispatched;
        }

        let mut own = Vec::with_capacity(request.ids.len());
        let mut guards = Vec::new();
        let mut followers = Vec::new();

        match self.in_flight.filter(|_| !request.no_cache) {
            None => own = request.ids.clone(),
            Some(in_flight) => {
                for id in &request.ids {
                    let key = EntityKey::new(request.entity, id.clone());
                    match in_flight.acquire(key.clone()) {
                        FlightSlot::Follower(rx) => followers.push((id.clone(), rx)),
                        FlightSlot::Leader(tx) => {
                            let guard = FlightGuard::new(in_flight, key, tx);
                            // A flight for this id may have landed since the
                            // cache was checked.
                            if let Some(entity) = self.store.entities().get(request.entity, id) {
                                dispatched.entities.push(entity.clone());
                                guard.publish(Some(entity));
                            } else if self.store.is_failed(request.entity, id) {
                                guard.publish(None);
                            } else {
                                own.push(id.clone());
                                guards.push(guard);
                            }
                        }
                    }
                }
            }
        }

        debug!(
            path = %self.path,
            entity = %request.entity,
            ids = own.len(),
            joined = followers.len(),
            batch = request.batch,
            no_cache = request.no_cache,
            "dispatching fetch"
        );

        let settled = self.call(request.fetcher, own, request.batch).await;
        let fetched = self.settle(&request, settled, &mut dispatched.report);

        for guard in guards {
            let outcome = fetched.by_id.get(&guard.key().id).cloned();
            guard.publish(outcome);
        }
        dispatched.entities.extend(fetched.entities);

        if !followers.is_empty() {
            let joined = followers.len();
            let outcomes = futures::future::join_all(
                followers
                    .into_iter()
                    .map(|(id, mut rx)| async move { (id, rx.recv().await) }),
            )
            .await;

            for (id, outcome) in outcomes {
                match outcome {
                    Ok(Some(entity)) => dispatched.entities.push(entity),
                    Ok(None) => trace!(entity = %request.entity, id = %id, "joined fetch did not return id"),
                    // The leading branch went away without publishing.
                    Err(_) => dispatched
                        .entities
                        .extend(self.store.entities().get(request.entity, &id)),
                }
            }

            dispatched.report.in_flight_joins += joined;
            ResolverMetrics::add(&self.metrics.in_flight_joins, joined);
        }

        dispatched
    }

    /// Issues one batch call, or one call per id with bounded concurrency.
    async fn call(&self, fetcher: &dyn RefFetcher, ids: Vec<EntityId>, batch: bool) -> Vec<Settled> {
        if ids.is_empty() {
            return Vec::new();
        }

        if batch {
            let result = fetcher.fetch(FetchRequest::Batch(ids.clone())).await;
            return vec![(ids, result)];
        }

        stream::iter(ids)
            .map(|id| async move {
                let result = fetcher.fetch(FetchRequest::One(id.clone())).await;
                (vec![id], result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }

    /// Registers results and records failures for every settled call.
    fn settle(
        &self,
        request: &DispatchRequest<'_>,
        settled: Vec<Settled>,
        report: &mut ResolveReport,
    ) -> FetchedEntities {
        let mut fetched = FetchedEntities::default();

        let calls = settled.len();
        report.fetch_calls += calls;
        ResolverMetrics::add(&self.metrics.fetch_calls, calls);
        metrics::counter!("reftree_fetch_calls_total").increment(calls as u64);

        // Ids asked for by calls that completed, and ids any call returned.
        let mut completed = Vec::new();
        let mut returned = HashSet::new();

        for (requested, result) in settled {
            let entities = match result {
                Ok(Fetched::Nothing) => {
                    report.raise(
                        self.path,
                        ResolveWarning::EmptyResult {
                            origin: request.origin,
                            entity: request.entity.to_string(),
                        },
                    );
                    Vec::new()
                }
                Ok(result) => result.into_entities(),
                Err(err) => {
                    report.raise(
                        self.path,
                        ResolveWarning::FetchRejected {
                            origin: request.origin,
                            entity: request.entity.to_string(),
                            reason: err.to_string(),
                        },
                    );
                    continue;
                }
            };

            completed.extend(requested);
            for entity in entities {
                if let Some(id) = entity.id() {
                    if request.no_cache {
                        self.store
                            .entities()
                            .refresh(request.entity, id.clone(), entity.clone());
                        report.entities_registered += 1;
                    } else if self
                        .store
                        .entities()
                        .register(request.entity, id.clone(), entity.clone())
                    {
                        report.entities_registered += 1;
                    }
                    fetched.by_id.entry(id.clone()).or_insert_with(|| entity.clone());
                    returned.insert(id);
                }
                fetched.entities.push(entity);
            }
        }

        for id in completed.iter().filter(|id| !returned.contains(*id)) {
            if self.store.failed().mark_failed(request.entity, id) {
                report.ids_marked_failed += 1;
                ResolverMetrics::add(&self.metrics.failed_ids, 1);
            }
            trace!(entity = %request.entity, id = %id, "id missing from fetch result");
        }

        fetched
    }
}

#[derive(Default)]
struct FetchedEntities {
    entities: Vec<Entity>,
    by_id: HashMap<EntityId, Entity>,
}
