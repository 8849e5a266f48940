//! Declarative fetch plans.
//!
//! A [`RootPlan`] names the root fetch and a tree of [`PlanNode`]s. Each
//! node describes which relation of its parents carries the ids to fetch,
//! how to fetch them, and which nodes hang below it.
//!
//! # Example
//!
//! ```ignore
//! let plan = RootPlan::new(CallIdentity::new("parcels:list"), "parcels")
//!     .fetch_with(|| async { api.list_parcels().await })
//!     .with_ref(
//!         PlanNode::new("address")
//!             .fetch_with(|req| async move { api.addresses(req).await })
//!             .with_ref(PlanNode::new("org").batch().fetch_with(orgs_by_ids)),
//!     )
//!     .with_side(SidePlan::new("stats").fetch_with(stats_by_parcel_ids));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::resolver::{RefFetcher, RootFetcher};

use super::types::CallIdentity;

/// A reference node: one entity fetch and its nested references.
#[derive(Clone)]
pub struct PlanNode {
    /// Target entity type name.
    pub entity: String,
    /// Key in the parent object carrying the id. Defaults to `entity`.
    pub relation_name: Option<String>,
    /// Fetcher for the referenced entities.
    pub fetch: Option<Arc<dyn RefFetcher>>,
    /// Issue one call with all ids instead of one call per id.
    pub batch: bool,
    /// Fetch even when ids are cached or previously failed.
    pub no_cache: bool,
    /// A missing relation on a parent is expected and not reported.
    pub optional: bool,
    /// Child references resolved against this node's results.
    pub refs: Vec<PlanNode>,
    /// Side fetches keyed off this node's result ids.
    pub sides: Vec<SidePlan>,
}

impl PlanNode {
    /// Creates a node targeting `entity`, read from the relation of the same name.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            relation_name: None,
            fetch: None,
            batch: false,
            no_cache: false,
            optional: false,
            refs: Vec::new(),
            sides: Vec::new(),
        }
    }

    /// Binds the fetcher for this node.
    pub fn fetch_with(mut self, fetcher: impl RefFetcher + 'static) -> Self {
        self.fetch = Some(Arc::new(fetcher));
        self
    }

    /// Binds an already shared fetcher.
    pub fn fetch_shared(mut self, fetcher: Arc<dyn RefFetcher>) -> Self {
        self.fetch = Some(fetcher);
        self
    }

    /// Reads ids from `relation` instead of the entity name.
    pub fn relation_name(mut self, relation: impl Into<String>) -> Self {
        self.relation_name = Some(relation.into());
        self
    }

    /// Fetches all ids in a single call.
    pub fn batch(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Bypasses the cache and the failed-id ledger for this node.
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Silences missing relation warnings.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Appends a child reference.
    pub fn with_ref(mut self, node: PlanNode) -> Self {
        self.refs.push(node);
        self
    }

    /// Appends a side fetch.
    pub fn with_side(mut self, side: SidePlan) -> Self {
        self.sides.push(side);
        self
    }

    /// The parent key carrying the ids for this node.
    pub fn relation(&self) -> &str {
        self.relation_name.as_deref().unwrap_or(&self.entity)
    }
}

impl fmt::Debug for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanNode")
            .field("entity", &self.entity)
            .field("relation", &self.relation())
            .field("has_fetch", &self.fetch.is_some())
            .field("batch", &self.batch)
            .field("no_cache", &self.no_cache)
            .field("optional", &self.optional)
            .field("refs", &self.refs)
            .field("sides", &self.sides)
            .finish()
    }
}

/// An auxiliary fetch keyed off a result set's own ids.
///
/// Sides are always batch calls and always honour the cache.
#[derive(Clone)]
pub struct SidePlan {
    pub entity: String,
    pub fetch: Option<Arc<dyn RefFetcher>>,
}

impl SidePlan {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fetch: None,
        }
    }

    pub fn fetch_with(mut self, fetcher: impl RefFetcher + 'static) -> Self {
        self.fetch = Some(Arc::new(fetcher));
        self
    }
}

impl fmt::Debug for SidePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SidePlan")
            .field("entity", &self.entity)
            .field("has_fetch", &self.fetch.is_some())
            .finish()
    }
}

/// The root of a fetch plan.
#[derive(Clone)]
pub struct RootPlan {
    /// Memo key for the root fetch call.
    pub identity: CallIdentity,
    /// Name of the entity the root fetch returns.
    pub entity: String,
    pub fetch: Option<Arc<dyn RootFetcher>>,
    /// Re-run the root fetch even if a memoised result exists.
    pub root_no_cache: bool,
    pub refs: Vec<PlanNode>,
    pub sides: Vec<SidePlan>,
}

impl RootPlan {
    pub fn new(identity: CallIdentity, entity: impl Into<String>) -> Self {
        Self {
            identity,
            entity: entity.into(),
            fetch: None,
            root_no_cache: false,
            refs: Vec::new(),
            sides: Vec::new(),
        }
    }

    pub fn fetch_with(mut self, fetcher: impl RootFetcher + 'static) -> Self {
        self.fetch = Some(Arc::new(fetcher));
        self
    }

    pub fn root_no_cache(mut self) -> Self {
        self.root_no_cache = true;
        self
    }

    pub fn with_ref(mut self, node: PlanNode) -> Self {
        self.refs.push(node);
        self
    }

    pub fn with_side(mut self, side: SidePlan) -> Self {
        self.sides.push(side);
        self
    }
}

impl fmt::Debug for RootPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootPlan")
            .field("identity", &self.identity)
            .field("entity", &self.entity)
            .field("has_fetch", &self.fetch.is_some())
            .field("root_no_cache", &self.root_no_cache)
            .field("refs", &self.refs)
            .field("sides", &self.sides)
            .finish()
    }
}
