//! Process-wide directory of binding collections, one per kernel connection.
//!
//! The registry is the lifecycle authority for both the sub-channel and the
//! collection: `register` creates them, wires resync-on-reconnect and
//! auto-unregistration, and `unregister` tears both down so no late event can
//! touch a dead collection. It is an explicit object owned by whatever
//! composes the application, not a hidden singleton.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use log::{debug, info};

use crate::channel::BindingChannel;
use crate::collection::BindingCollection;
use crate::observe::SubscriptionId;
use crate::transport::{ConnectionKey, ConnectionStatus, KernelConnection};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// `get_bindings` ran before `register` for that connection. This is a
    /// collaborator programming error, not a runtime condition to recover
    /// from.
    #[error("kernel connection is not registered with the binding registry")]
    NotRegistered,
}

struct RegistryEntry {
    collection: Arc<BindingCollection>,
    channel: Arc<BindingChannel>,
    connection: Weak<dyn KernelConnection>,
    status_sub: Option<SubscriptionId>,
    disposed_sub: Option<SubscriptionId>,
}

pub struct BindingRegistry {
    entries: Mutex<HashMap<ConnectionKey, RegistryEntry>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a kernel connection, returning its binding collection.
    ///
    /// Idempotent: a connection that is already registered gets its existing
    /// collection back unchanged, without reopening the channel. Rapid
    /// repeated calls (cell toolbar and status panel racing) therefore never
    /// create duplicate channels.
    ///
    /// On first registration this opens the sub-channel, requests the initial
    /// binding list, reopens + resyncs on every transition to `Connected`
    /// (there is no event replay in the protocol, so a full resync is the
    /// only correctness mechanism after a drop), and unregisters itself when
    /// the connection is disposed.
    pub fn register(
        self: &Arc<Self>,
        connection: &Arc<dyn KernelConnection>,
    ) -> Arc<BindingCollection> {
        self.register_at(ConnectionKey::of(connection), connection)
    }

    fn register_at(
        self: &Arc<Self>,
        key: ConnectionKey,
        connection: &Arc<dyn KernelConnection>,
    ) -> Arc<BindingCollection> {
        // Membership check and insert happen under one lock, so racing
        // register calls for the same connection cannot create duplicate
        // channels.
        let (collection, channel) = {
            let mut entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get(&key) {
                if entry.connection.upgrade().is_some() {
                    debug!("kernel connection already registered; reusing its collection");
                    return Arc::clone(&entry.collection);
                }
                // The previous connection at this address was dropped without
                // firing its disposed event, and a new allocation now aliases
                // its key. Tear the dead entry down before reusing the slot.
                if let Some(stale) = entries.remove(&key) {
                    stale.channel.dispose();
                    stale.collection.dispose();
                    info!("discarded stale registry entry for a dropped kernel connection");
                }
            }
            let collection = Arc::new(BindingCollection::new());
            let channel = BindingChannel::new(Arc::clone(&collection));
            entries.insert(
                key,
                RegistryEntry {
                    collection: Arc::clone(&collection),
                    channel: Arc::clone(&channel),
                    connection: Arc::downgrade(connection),
                    status_sub: None,
                    disposed_sub: None,
                },
            );
            (collection, channel)
        };

        if channel.open(connection) {
            channel.request_binding_list();
        }

        let status_sub = {
            let channel = Arc::clone(&channel);
            let connection_weak = Arc::downgrade(connection);
            connection.on_status_changed(Box::new(move |status| {
                if status != ConnectionStatus::Connected {
                    return;
                }
                let Some(connection) = connection_weak.upgrade() else {
                    return;
                };
                debug!("kernel reconnected; reopening binding channel and resyncing");
                if channel.open(&connection) {
                    channel.request_binding_list();
                }
            }))
        };
        let disposed_sub = {
            let registry = Arc::downgrade(self);
            connection.on_disposed(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.unregister_key(key);
                }
            }))
        };

        if let Some(entry) = self.entries.lock().unwrap().get_mut(&key) {
            entry.status_sub = Some(status_sub);
            entry.disposed_sub = Some(disposed_sub);
        }

        info!("registered kernel connection for binding sync");
        collection
    }

    /// Tear down the channel and collection for a connection. Safe no-op when
    /// the connection was never registered.
    pub fn unregister(&self, connection: &Arc<dyn KernelConnection>) {
        self.unregister_key(ConnectionKey::of(connection));
    }

    fn unregister_key(&self, key: ConnectionKey) {
        let entry = self.entries.lock().unwrap().remove(&key);
        let Some(entry) = entry else {
            return;
        };
        entry.channel.dispose();
        entry.collection.dispose();
        if let Some(connection) = entry.connection.upgrade() {
            if let Some(id) = entry.status_sub {
                connection.remove_status_listener(id);
            }
            if let Some(id) = entry.disposed_sub {
                connection.remove_disposed_listener(id);
            }
        }
        info!("unregistered kernel connection from binding sync");
    }

    /// The collection for a registered connection.
    pub fn get_bindings(
        &self,
        connection: &Arc<dyn KernelConnection>,
    ) -> Result<Arc<BindingCollection>, RegistryError> {
        self.entries
            .lock()
            .unwrap()
            .get(&ConnectionKey::of(connection))
            .map(|entry| Arc::clone(&entry.collection))
            .ok_or(RegistryError::NotRegistered)
    }

    pub fn is_registered(&self, connection: &Arc<dyn KernelConnection>) -> bool {
        self.entries
            .lock()
            .unwrap()
            .contains_key(&ConnectionKey::of(connection))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Tear down every registered connection. For application shutdown.
    pub fn dispose(&self) {
        let keys: Vec<ConnectionKey> = self.entries.lock().unwrap().keys().copied().collect();
        for key in keys {
            self.unregister_key(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn channel_of(
        &self,
        connection: &Arc<dyn KernelConnection>,
    ) -> Option<Arc<BindingChannel>> {
        self.entries
            .lock()
            .unwrap()
            .get(&ConnectionKey::of(connection))
            .map(|entry| Arc::clone(&entry.channel))
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
