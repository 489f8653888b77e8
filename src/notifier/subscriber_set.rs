use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use super::ZoneObserver;

/// Identity of one registration; two subscriptions of the same observer get distinct ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Registered observers keyed by registration id
pub struct SubscriberSet {
    next_id: AtomicU64,
    entries: RwLock<BTreeMap<SubscriptionId, Arc<dyn ZoneObserver>>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, observer: Arc<dyn ZoneObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().insert(id, observer);
        id
    }

    /// Remove one registration; `false` if it was already gone
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Point-in-time copy of the registrations for one broadcast
    pub fn snapshot(&self) -> Vec<(SubscriptionId, Arc<dyn ZoneObserver>)> {
        self.entries
            .read()
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }
}

impl Default for SubscriberSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`ZoneNotifier::subscribe`](super::ZoneNotifier::subscribe).
///
/// Dropping the handle keeps the observer subscribed; only [`cancel`](Self::cancel)
/// removes it.
#[derive(Clone)]
#[must_use = "the handle is the only way to unsubscribe this observer"]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    subscribers: Weak<SubscriberSet>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, subscribers: &Arc<SubscriberSet>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove this registration. Idempotent: returns `true` only for the call
    /// that actually removed it.
    pub fn cancel(&self) -> bool {
        let Some(subscribers) = self.subscribers.upgrade() else {
            return false;
        };

        let removed = subscribers.remove(self.id);
        if removed {
            debug!("Subscription {} cancelled", self.id);
        }
        removed
    }

    pub fn is_active(&self) -> bool {
        self.subscribers
            .upgrade()
            .is_some_and(|subscribers| subscribers.contains(self.id))
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
