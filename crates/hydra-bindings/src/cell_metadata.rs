//! Binding-specific view over a cell's persisted metadata.
//!
//! The assignment lives under one namespaced key inside the cell's own
//! metadata object, so it travels with the notebook file. The adapter only
//! ever touches that key and filters raw "some metadata changed" signals
//! down to binding-name changes before they reach a callback.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::document::NotebookCell;
use crate::observe::SubscriptionId;

/// Namespaced metadata key holding a cell's binding assignment. The Hydra
/// kernel reads the same key off execute-request metadata to route the cell.
pub const BINDING_NAME_KEY: &str = "chameleon.binding_name";

pub struct CellMetadataAdapter {
    key: String,
    /// Listeners this adapter installed, so `dispose` can detach them and
    /// stop holding cells of a closed document.
    installed: Mutex<Vec<(Arc<dyn NotebookCell>, SubscriptionId)>>,
}

impl CellMetadataAdapter {
    pub fn new() -> Self {
        Self::with_key(BINDING_NAME_KEY)
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            installed: Mutex::new(Vec::new()),
        }
    }

    pub fn has_binding(&self, cell: &Arc<dyn NotebookCell>) -> bool {
        self.binding_name(cell).is_some()
    }

    pub fn binding_name(&self, cell: &Arc<dyn NotebookCell>) -> Option<String> {
        cell.get_metadata(&self.key)
            .and_then(|value| value.as_str().map(str::to_owned))
    }

    pub fn set_binding_name(&self, cell: &Arc<dyn NotebookCell>, name: &str) {
        cell.set_metadata(&self.key, Value::String(name.to_string()));
    }

    pub fn remove_binding(&self, cell: &Arc<dyn NotebookCell>) {
        cell.remove_metadata(&self.key);
    }

    /// Run `callback` whenever the binding-name key changes on `cell`.
    /// Changes to unrelated metadata keys never reach the callback. Multiple
    /// registrations on the same cell are independent and all fire.
    pub fn on_binding_name_changed(
        &self,
        cell: &Arc<dyn NotebookCell>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionId {
        let key = self.key.clone();
        let id = cell.on_metadata_changed(Box::new(move |changed| {
            if changed == key {
                callback();
            }
        }));
        self.installed.lock().unwrap().push((Arc::clone(cell), id));
        id
    }

    /// Detach every listener this adapter installed. Call when the owning
    /// document closes.
    pub fn dispose(&self) {
        for (cell, id) in self.installed.lock().unwrap().drain(..) {
            cell.remove_metadata_listener(id);
        }
    }
}

impl Default for CellMetadataAdapter {
    fn default() -> Self {
        Self::new()
    }
}
