//! Internal traversal context for the reference walk.

use std::sync::Arc;

/// Position of a branch in the plan tree, used for log fields.
#[derive(Debug, Clone)]
pub(crate) struct WalkContext {
    /// Current depth (root = 0).
    pub(crate) depth: u32,
    /// Slash-separated entity path from the root (e.g., "parcels/address/org").
    /// Wrapped in Arc for cheap cloning across sibling branches.
    pub(crate) path: Arc<str>,
}

impl WalkContext {
    pub(crate) fn root(entity: &str) -> Self {
        Self {
            depth: 0,
            path: Arc::from(entity),
        }
    }

    pub(crate) fn child(&self, entity: &str) -> Self {
        Self {
            depth: self.depth + 1,
            path: Arc::from(format!("{}/{}", self.path, entity)),
        }
    }
}
