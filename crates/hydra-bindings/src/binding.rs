//! The binding data model: a named logical execution target known to a kernel.
//!
//! Bindings are announced by the kernel side over the `hydra` sub-channel and
//! mirrored verbatim in the front-end collection. The front-end never mutates
//! a binding's state speculatively; only protocol events from the owning
//! channel do. The JSON field names here are the wire shape, so the serde
//! renames are load-bearing.

use serde::{Deserialize, Serialize};

/// Kernel type assumed when a binding does not name one.
pub const DEFAULT_KERNEL: &str = "bash";

/// Sub-kernel runtimes the Hydra kernel can provision.
pub const SUPPORTED_KERNELS: &[&str] = &["bash", "python"];

/// A named logical execution target. `name` is the primary key within one
/// collection; no separate id is stable across reconnects in all protocol
/// versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Binding {
    pub name: String,

    /// Runtime hint for the sub-kernel (e.g. "bash", "python").
    #[serde(rename = "kernel", skip_serializing_if = "Option::is_none", default)]
    pub kernel_type: Option<String>,

    /// Explicit editor MIME type; overrides the kernel-derived default.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none", default)]
    pub mime_type: Option<String>,

    pub connection: BindingConnection,

    pub state: BindingState,

    /// Long-running connection setup reports progress here via
    /// `binding_update` events.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub progress: Option<BindingProgress>,
}

/// Where the binding executes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BindingConnection {
    /// Runs alongside the Hydra kernel itself.
    Local,
    /// Remote host reached over SSH.
    Ssh {
        host: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        user: Option<String>,
        #[serde(
            rename = "privateKeyFile",
            skip_serializing_if = "Option::is_none",
            default
        )]
        private_key_file: Option<String>,
    },
    /// Container managed by the remote side.
    Container {
        #[serde(rename = "containerId")]
        container_id: String,
    },
}

/// Live connection state, owned by the kernel side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindingState {
    Creating,
    Connected,
    Disconnected,
    Interrupted,
    Error,
}

/// Progress of a long-running connection setup step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindingProgress {
    /// Human-readable label, e.g. "Establishing secure connection".
    #[serde(rename = "progress")]
    pub label: String,
    #[serde(
        rename = "progressRatio",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub ratio: Option<f64>,
}

/// Default editor MIME type for a sub-kernel runtime.
pub fn default_mime_type(kernel: &str) -> Option<&'static str> {
    match kernel {
        "bash" => Some("text/x-sh"),
        "python" => Some("text/x-python"),
        _ => None,
    }
}

impl Binding {
    /// MIME type to use for syntax highlighting in cells assigned to this
    /// binding: the explicit `mimeType` if the kernel sent one, otherwise
    /// the default for its kernel type.
    pub fn editor_mime_type(&self) -> Option<String> {
        if let Some(mime) = &self.mime_type {
            return Some(mime.clone());
        }
        default_mime_type(self.kernel_type.as_deref().unwrap_or(DEFAULT_KERNEL))
            .map(str::to_owned)
    }
}
