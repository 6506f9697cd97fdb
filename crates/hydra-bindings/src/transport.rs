//! The consumed interface of the kernel transport.
//!
//! The real kernel connection lives in the host application; this crate only
//! needs three things from it: opening a named sub-channel, connection-status
//! notifications (to resync after reconnects), and a disposal notification
//! (to auto-unregister). Inbound sub-channel traffic arrives over a tokio
//! mpsc channel and is delivered in order.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::observe::SubscriptionId;

/// Status of a kernel's transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Both ends of one open named sub-channel, from the front-end's perspective:
/// `sender` carries outbound wire messages, `receiver` inbound ones.
pub struct SubChannel {
    pub sender: mpsc::UnboundedSender<Value>,
    pub receiver: mpsc::UnboundedReceiver<Value>,
}

pub type StatusCallback = Box<dyn Fn(ConnectionStatus) + Send + Sync>;
pub type DisposedCallback = Box<dyn Fn() + Send + Sync>;

/// One kernel connection, borrowed from the host.
pub trait KernelConnection: Send + Sync {
    /// Open the named sub-channel over this connection's transport.
    /// Returns `None` when the kernel does not support sub-channels
    /// (older/incompatible kernels); callers degrade to an empty binding
    /// collection rather than erroring.
    fn open_channel(&self, name: &str) -> Option<SubChannel>;

    fn on_status_changed(&self, callback: StatusCallback) -> SubscriptionId;
    fn remove_status_listener(&self, id: SubscriptionId);

    /// `callback` fires when the connection object itself is disposed. The
    /// same logical kernel restarted later is a *new* connection object and
    /// needs a fresh `register`.
    ///
    /// Hosts must fire this before releasing their last strong reference:
    /// the registry keys entries by address, so an entry whose connection
    /// vanished silently would survive until a later allocation collides
    /// with it.
    fn on_disposed(&self, callback: DisposedCallback) -> SubscriptionId;
    fn remove_disposed_listener(&self, id: SubscriptionId);
}

/// Registry key for a connection: reference identity of the connection
/// object, not any string id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey(usize);

impl ConnectionKey {
    pub fn of(connection: &Arc<dyn KernelConnection>) -> Self {
        ConnectionKey(Arc::as_ptr(connection) as *const () as usize)
    }
}
