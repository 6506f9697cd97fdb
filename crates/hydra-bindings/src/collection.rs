//! Observable, ordered collection of the bindings known for one kernel
//! connection.
//!
//! A collection is exclusively owned by its `BindingRegistry` entry; the
//! mutators are crate-private and only the owning channel/registry call them.
//! Consumers (assignment controller, status panel) hold a shared reference
//! and subscribe to change notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::binding::Binding;
use crate::observe::{Listeners, SubscriptionId};

/// What changed in a collection, delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingChange {
    /// The entire contents were replaced (a `binding_list_reply`).
    Replaced,
    /// One binding was added or updated in place.
    Upserted { name: String },
    /// One binding was removed.
    Removed { name: String },
}

pub struct BindingCollection {
    bindings: Mutex<Vec<Binding>>,
    listeners: Listeners<BindingChange>,
    disposed: AtomicBool,
}

impl BindingCollection {
    pub fn new() -> Self {
        Self {
            bindings: Mutex::new(Vec::new()),
            listeners: Listeners::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the bindings in server-provided order.
    pub fn items(&self) -> Vec<Binding> {
        self.bindings.lock().unwrap().clone()
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.bindings
            .lock()
            .unwrap()
            .iter()
            .find(|binding| binding.name == name)
            .cloned()
    }

    /// Position of the named binding. Linear scan; binding counts are small.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bindings
            .lock()
            .unwrap()
            .iter()
            .position(|binding| binding.name == name)
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.lock().unwrap().is_empty()
    }

    pub fn subscribe(
        &self,
        callback: impl Fn(&BindingChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Replace the entire contents, preserving `items` order. Full-list
    /// replies always win over prior incremental state.
    pub(crate) fn replace_all(&self, bindings: Vec<Binding>) {
        if self.is_disposed() {
            return;
        }
        *self.bindings.lock().unwrap() = bindings;
        self.listeners.emit(&BindingChange::Replaced);
    }

    /// Insert or update by name. An update replaces the entry in place so the
    /// collection order never changes for known names.
    pub(crate) fn upsert(&self, binding: Binding) {
        if self.is_disposed() {
            return;
        }
        let name = binding.name.clone();
        {
            let mut bindings = self.bindings.lock().unwrap();
            match bindings.iter().position(|entry| entry.name == name) {
                Some(index) => bindings[index] = binding,
                None => bindings.push(binding),
            }
        }
        self.listeners.emit(&BindingChange::Upserted { name });
    }

    /// Remove by name. Unknown names are a no-op; protocol messages may race
    /// with a consumer's view.
    pub(crate) fn remove(&self, name: &str) -> bool {
        if self.is_disposed() {
            return false;
        }
        let removed = {
            let mut bindings = self.bindings.lock().unwrap();
            let before = bindings.len();
            bindings.retain(|binding| binding.name != name);
            bindings.len() != before
        };
        if removed {
            self.listeners.emit(&BindingChange::Removed {
                name: name.to_string(),
            });
        }
        removed
    }

    /// Tear the collection down. After this no event can mutate it and no
    /// subscriber fires again; mutators become no-ops.
    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.bindings.lock().unwrap().clear();
        self.listeners.clear();
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for BindingCollection {
    fn default() -> Self {
        Self::new()
    }
}
