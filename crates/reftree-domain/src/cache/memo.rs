//! Memo of root fetch results keyed by call identity.

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::{CallIdentity, Entity};

/// Last successful root result per call identity.
///
/// Entries live for the lifetime of the memo; a forced root refetch
/// overwrites the previous result.
#[derive(Debug, Default)]
pub struct RootCallMemo {
    results: DashMap<CallIdentity, Arc<[Entity]>>,
}

impl RootCallMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoised result for an identity.
    pub fn get(&self, identity: &CallIdentity) -> Option<Arc<[Entity]>> {
        self.results
            .get(identity)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Stores (or replaces) the result for an identity.
    pub fn store(&self, identity: CallIdentity, result: Arc<[Entity]>) {
        self.results.insert(identity, result);
    }

    pub fn contains(&self, identity: &CallIdentity) -> bool {
        self.results.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
