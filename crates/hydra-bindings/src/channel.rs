//! The binding sub-channel: one open `hydra` channel per kernel connection.
//!
//! Translates inbound wire messages into collection mutations and outbound
//! intents into wire messages. Each inbound message is dispatched into the
//! owning collection on the turn it is received; there is no batching, so
//! within one channel events apply strictly in delivery order.
//!
//! All channel-level faults are absorbed here and logged. A broken binding
//! sync must never prevent the user from using the notebook's default
//! execution context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::collection::BindingCollection;
use crate::protocol::{BindingEvent, BindingRequest, BINDING_CHANNEL};
use crate::transport::{KernelConnection, SubChannel};

pub struct BindingChannel {
    collection: Arc<BindingCollection>,
    outbound: Mutex<Option<UnboundedSender<Value>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl BindingChannel {
    pub fn new(collection: Arc<BindingCollection>) -> Arc<Self> {
        Arc::new(Self {
            collection,
            outbound: Mutex::new(None),
            pump: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    /// Open the `hydra` sub-channel on `connection`, closing any channel
    /// already open. Returns false (and logs) when the transport does not
    /// support sub-channels; the collection then simply stays empty.
    pub fn open(self: &Arc<Self>, connection: &Arc<dyn KernelConnection>) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        self.close();

        let Some(SubChannel {
            sender,
            mut receiver,
        }) = connection.open_channel(BINDING_CHANNEL)
        else {
            warn!("kernel transport does not support sub-channels; bindings unavailable");
            return false;
        };

        *self.outbound.lock().unwrap() = Some(sender);

        let channel = Arc::downgrade(self);
        let pump = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                let Some(channel) = channel.upgrade() else {
                    break;
                };
                channel.handle_message(message);
            }
        });
        *self.pump.lock().unwrap() = Some(pump);
        true
    }

    pub fn is_open(&self) -> bool {
        self.outbound.lock().unwrap().is_some()
    }

    /// Fire-and-forget request for the full binding list; the reply arrives
    /// later as a `binding_list_reply` event.
    pub fn request_binding_list(&self) {
        let outbound = self.outbound.lock().unwrap();
        let Some(sender) = outbound.as_ref() else {
            debug!("binding channel not open; skipping list request");
            return;
        };
        if let Ok(message) = serde_json::to_value(BindingRequest::BindingListRequest) {
            // A dropped receiver means the transport went away; the resync on
            // reconnect covers it.
            let _ = sender.send(message);
        }
    }

    /// Dispatch one inbound wire message into the collection. Unknown event
    /// kinds and malformed payloads are ignored.
    pub fn handle_message(&self, message: Value) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let event: BindingEvent = match serde_json::from_value(message) {
            Ok(event) => event,
            Err(err) => {
                debug!("ignoring unrecognized binding event: {err}");
                return;
            }
        };
        match event {
            BindingEvent::BindingListReply { bindings } => self.collection.replace_all(bindings),
            BindingEvent::BindingUpdate { binding } => self.collection.upsert(binding),
            BindingEvent::BindingRemove { binding } => {
                self.collection.remove(&binding.name);
            }
        }
    }

    /// Close the sub-channel, detaching the inbound pump. Safe to call when
    /// already closed.
    pub fn close(&self) {
        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }
        self.outbound.lock().unwrap().take();
    }

    /// Close and permanently disable the channel. Idempotent; a disposed
    /// channel drops every further inbound message.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.close();
    }

    #[cfg(test)]
    pub(crate) async fn join_pump(&self) {
        let pump = self.pump.lock().unwrap().take();
        if let Some(pump) = pump {
            let _ = pump.await;
        }
    }
}

impl Drop for BindingChannel {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }
    }
}
