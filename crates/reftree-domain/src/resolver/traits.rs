//! Fetcher traits the resolver calls out to.
//!
//! Transport is a caller concern: an HTTP client, a GraphQL resolver or an
//! in-memory fixture all plug in through these traits. Plain closures
//! returning futures implement them directly.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchResult;
use crate::model::{Entity, EntityId};

/// What a reference fetcher is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// A single id (non-batch nodes issue one request per id).
    One(EntityId),
    /// All ids of a batch node or side fetch, in first-seen order.
    Batch(Vec<EntityId>),
}

impl FetchRequest {
    /// Ids covered by this request.
    pub fn ids(&self) -> &[EntityId] {
        match self {
            FetchRequest::One(id) => std::slice::from_ref(id),
            FetchRequest::Batch(ids) => ids,
        }
    }
}

/// A fetch result before normalisation.
///
/// A fetcher may answer with nothing, a single entity or a list; the
/// resolver always works on the list form.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Fetched {
    /// The fetch completed without a result.
    #[default]
    Nothing,
    /// A single entity.
    One(Entity),
    /// A list of entities.
    Many(Vec<Entity>),
}

impl Fetched {
    /// Converts a JSON payload: null, an object, or an array of objects.
    ///
    /// Array elements that are not objects are dropped; any other scalar is
    /// treated as no result.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Fetched::One(Entity::from_map(fields)),
            Value::Array(items) => {
                Fetched::Many(items.into_iter().filter_map(Entity::from_value).collect())
            }
            _ => Fetched::Nothing,
        }
    }

    /// Returns true when the fetch produced no result at all.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Fetched::Nothing)
    }

    /// Normalises to a list (a single entity becomes a one-element list).
    pub fn into_entities(self) -> Vec<Entity> {
        match self {
            Fetched::Nothing => Vec::new(),
            Fetched::One(entity) => vec![entity],
            Fetched::Many(entities) => entities,
        }
    }
}

impl From<Entity> for Fetched {
    fn from(entity: Entity) -> Self {
        Fetched::One(entity)
    }
}

impl From<Vec<Entity>> for Fetched {
    fn from(entities: Vec<Entity>) -> Self {
        Fetched::Many(entities)
    }
}

impl From<Option<Entity>> for Fetched {
    fn from(entity: Option<Entity>) -> Self {
        entity.map_or(Fetched::Nothing, Fetched::One)
    }
}

/// Fetches referenced entities by id.
#[async_trait]
pub trait RefFetcher: Send + Sync {
    /// Fetches the entities named by `request`.
    async fn fetch(&self, request: FetchRequest) -> FetchResult<Fetched>;
}

/// Fetches the root result set of a plan.
#[async_trait]
pub trait RootFetcher: Send + Sync {
    /// Fetches the root entities.
    async fn fetch(&self) -> FetchResult<Fetched>;
}

#[async_trait]
impl<F, Fut> RefFetcher for F
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult<Fetched>> + Send + 'static,
{
    async fn fetch(&self, request: FetchRequest) -> FetchResult<Fetched> {
        (self)(request).await
    }
}

#[async_trait]
impl<F, Fut> RootFetcher for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult<Fetched>> + Send + 'static,
{
    async fn fetch(&self) -> FetchResult<Fetched> {
        (self)().await
    }
}
