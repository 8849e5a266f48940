//! Sharing in-flight entity fetches between concurrent branches.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::cache::EntityKey;
use crate::model::Entity;

/// Outcome of one id's fetch: the entity, or `None` when it was not returned.
pub(crate) type FlightOutcome = Option<Entity>;

/// Result of trying to acquire a slot for an id.
pub(crate) enum FlightSlot {
    /// No fetch is pending for the key; the caller fetches and publishes.
    Leader(broadcast::Sender<FlightOutcome>),
    /// Another branch is fetching the key; wait for its outcome.
    Follower(broadcast::Receiver<FlightOutcome>),
}

/// Pending fetches keyed by `(entity type, id)`.
///
/// Acquisition uses the map's entry API so checking for a pending fetch
/// and registering a new one is a single atomic step.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pending: DashMap<EntityKey, broadcast::Sender<FlightOutcome>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(&self, key: EntityKey) -> FlightSlot {
        match self.pending.entry(key) {
            Entry::Occupied(entry) => FlightSlot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                FlightSlot::Leader(tx)
            }
        }
    }

    fn complete(&self, key: &EntityKey) {
        self.pending.remove(key);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Leadership of one key. Removes the pending entry when dropped, so
/// followers see a closed channel if the leader never publishes.
pub(crate) struct FlightGuard<'a> {
    in_flight: &'a InFlight,
    key: EntityKey,
    tx: broadcast::Sender<FlightOutcome>,
    completed: bool,
}

impl<'a> FlightGuard<'a> {
    pub(crate) fn new(
        in_flight: &'a InFlight,
        key: EntityKey,
        tx: broadcast::Sender<FlightOutcome>,
    ) -> Self {
        Self {
            in_flight,
            key,
            tx,
            completed: false,
        }
    }

    pub(crate) fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Publishes the outcome to every waiting follower and releases the key.
    pub(crate) fn publish(mut self, outcome: FlightOutcome) {
        // No receivers is fine: nobody joined this flight.
        let _ = self.tx.send(outcome);
        self.in_flight.complete(&self.key);
        self.completed = true;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.in_flight.complete(&self.key);
        }
    }
}
