//! Listener bookkeeping for observable state.
//!
//! Everything in this crate that notifies consumers (the binding collection,
//! the mock document model in tests, host implementations of the transport
//! traits) does so through a plain listener set rather than any UI-framework
//! observable: subscribe returns an id, unsubscribe takes it back, emit calls
//! every registered callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle for a registered listener. Returned by `subscribe`-style methods
/// across the crate; pass it back to the matching unsubscribe method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered set of callbacks with id-based removal.
pub struct Listeners<T> {
    entries: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a callback. Callbacks are independent; registering the same
    /// closure twice yields two entries that both fire.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().unwrap().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if the id was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Call every registered callback with `event`, in subscription order.
    ///
    /// The entry list is snapshotted first so callbacks may subscribe or
    /// unsubscribe (including themselves) without deadlocking.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }

    /// Drop every registered callback.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}
