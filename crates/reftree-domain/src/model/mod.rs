//! Entity and plan types.
//!
//! This module contains:
//! - Entity values and their identifiers
//! - Root call identities used for memoisation
//! - Declarative fetch plans (root, reference nodes, side fetches)

mod plan;
mod types;
#[cfg(test)]
mod types_proptest;

pub use plan::{PlanNode, RootPlan, SidePlan};
pub use types::*;
