//! reftree-domain: Core reference resolution logic
//!
//! This crate resolves trees of entity references declared ahead of time.
//! A thin API response (a parcel carrying only an `address` id, say) is
//! expanded by fetching each referenced entity once and keeping it in a
//! flat, deduplicated store:
//! - Plan and entity model
//! - Entity cache, failed-id ledger and root call memo
//! - Recursive reference walker with batch or per-id fetch dispatch
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                reftree-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Entities, ids, plans         │
//! │  cache/      - Entity store & root memo     │
//! │  resolver/   - Reference tree walker        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use reftree_domain::{
//!     CallIdentity, Entity, FetchError, FetchRequest, Fetched, PlanNode, ReferenceResolver,
//!     RootPlan,
//! };
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let plan = RootPlan::new(CallIdentity::new("parcels"), "parcels")
//!     .fetch_with(|| async {
//!         Ok::<_, FetchError>(Fetched::from_json(json!([{"id": "p1", "address": "a1"}])))
//!     })
//!     .with_ref(PlanNode::new("address").fetch_with(|request: FetchRequest| async move {
//!         let id = request.ids()[0].clone();
//!         Ok::<_, FetchError>(Fetched::from_json(json!({"id": id.as_str(), "city": "Lyon"})))
//!     }));
//!
//! let resolver = ReferenceResolver::new();
//! let report = resolver.resolve(&plan).await;
//!
//! assert!(report.is_clean());
//! assert!(resolver.store().get("address", &"a1".into()).is_some());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod model;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use cache::{register_resolver_metrics, FailedIdScope, ReferenceStore};
pub use error::{FetchError, FetchOrigin, FetchResult, ResolveWarning};
pub use model::{CallIdentity, Entity, EntityId, PlanNode, RootPlan, SidePlan};
pub use resolver::{
    FetchRequest, Fetched, RefFetcher, ReferenceResolver, ResolveReport, ResolverConfig,
    RootFetcher,
};
