//! Wire protocol for the `hydra` sub-channel.
//!
//! Messages are JSON objects carrying an `event` discriminator. The protocol
//! has no sequence numbers or replay; a full `binding_list_reply` is the only
//! resynchronization mechanism, which is why it always clears the collection
//! before inserting (see `channel`).

use serde::{Deserialize, Serialize};

use crate::binding::Binding;

/// Reserved sub-channel name the Hydra kernel registers its comm target under.
pub const BINDING_CHANNEL: &str = "hydra";

/// Messages the front-end sends to the kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BindingRequest {
    /// Ask for the full binding list; the reply arrives asynchronously as a
    /// `binding_list_reply` event.
    BindingListRequest,
}

/// Messages the kernel sends to the front-end.
///
/// Unknown event kinds fail to parse and are ignored by the channel for
/// forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BindingEvent {
    /// Authoritative full list; replaces all prior incremental state.
    BindingListReply { bindings: Vec<Binding> },
    /// Upsert by name: replace in place if known, append otherwise.
    BindingUpdate { binding: Binding },
    /// Remove by name; a no-op when the name is unknown.
    BindingRemove { binding: Binding },
}
