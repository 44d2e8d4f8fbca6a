//! Subscriber registry with snapshot iteration
//!
//! Copy-on-write: the member list lives behind an `Arc<[_]>` that is replaced
//! wholesale on add/remove. Fan-out clones the `Arc` (O(1)) and iterates
//! without holding any lock, so a connect or disconnect racing a broadcast
//! never blocks it and is never seen half-applied.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

pub type SubscriberRef = Arc<dyn Subscriber>;

/// Frozen view of the registry at one instant
pub type Snapshot = Arc<[SubscriberRef]>;

pub struct ClientRegistry {
    /// Shows up in log lines to tell the registries apart
    label: &'static str,
    members: RwLock<Snapshot>,
    count: AtomicUsize,
}

impl ClientRegistry {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            members: RwLock::new(Arc::from(Vec::new())),
            count: AtomicUsize::new(0),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Insert `subscriber` unless already present. Returns the member count.
    pub fn add(&self, subscriber: SubscriberRef) -> usize {
        let id = subscriber.id();
        let mut members = self.members.write();
        if members.iter().any(|s| s.id() == id) {
            return members.len();
        }

        let mut next = Vec::with_capacity(members.len() + 1);
        next.extend(members.iter().cloned());
        next.push(subscriber);
        *members = next.into();

        let count = members.len();
        self.count.store(count, Ordering::Release);
        drop(members);

        tracing::info!(registry = self.label, subscriber = %id, clients = count, "Client added");
        count
    }

    /// Remove the subscriber with `id` if present. Returns the member count.
    pub fn remove(&self, id: SubscriberId) -> usize {
        let mut members = self.members.write();
        if !members.iter().any(|s| s.id() == id) {
            return members.len();
        }

        let next: Vec<_> = members.iter().filter(|s| s.id() != id).cloned().collect();
        *members = next.into();

        let count = members.len();
        self.count.store(count, Ordering::Release);
        drop(members);

        tracing::info!(registry = self.label, subscriber = %id, clients = count, "Client removed");
        count
    }

    /// Current member count; a single atomic load
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members.read().iter().any(|s| s.id() == id)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.members.read().clone()
    }

    /// Visit every member of the snapshot taken on entry.
    ///
    /// Mutations made while visiting, including by the visitor itself, take
    /// effect for the next call only.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&SubscriberRef),
    {
        let snapshot = self.snapshot();
        for subscriber in snapshot.iter() {
            visitor(subscriber);
        }
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("label", &self.label)
            .field("count", &self.count())
            .finish()
    }
}
