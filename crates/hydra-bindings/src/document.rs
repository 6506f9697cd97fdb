//! The consumed interface of the notebook document and cell model.
//!
//! The document lives in the host front-end; this crate only needs the cell
//! list (with add notifications), the current kernel connection (with change
//! notifications), and per-cell persisted metadata as a key-value store with
//! change notification. Cell metadata may be mutated concurrently by other
//! extensions, so callbacks report which key changed.

use std::sync::Arc;

use serde_json::Value;

use crate::observe::SubscriptionId;
use crate::transport::KernelConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

pub type MetadataCallback = Box<dyn Fn(&str) + Send + Sync>;

/// One notebook cell, borrowed from the document model.
pub trait NotebookCell: Send + Sync {
    fn id(&self) -> String;
    fn cell_type(&self) -> CellType;
    fn source(&self) -> String;

    fn get_metadata(&self, key: &str) -> Option<Value>;
    fn set_metadata(&self, key: &str, value: Value);
    fn remove_metadata(&self, key: &str);

    /// `callback` receives the key that changed, for any metadata producer.
    fn on_metadata_changed(&self, callback: MetadataCallback) -> SubscriptionId;
    fn remove_metadata_listener(&self, id: SubscriptionId);
}

/// A change to the document's cell list.
pub enum CellListChange {
    Added {
        index: usize,
        cell: Arc<dyn NotebookCell>,
    },
    Removed {
        index: usize,
        cell_id: String,
    },
}

pub type CellListCallback = Box<dyn Fn(&CellListChange) + Send + Sync>;
pub type KernelChangedCallback = Box<dyn Fn() + Send + Sync>;

/// One open notebook document, borrowed from the host.
pub trait NotebookDocument: Send + Sync {
    fn cells(&self) -> Vec<Arc<dyn NotebookCell>>;

    /// The document's current kernel connection, if any. After a kernel
    /// restart this is a different connection object.
    fn kernel(&self) -> Option<Arc<dyn KernelConnection>>;

    fn on_cells_changed(&self, callback: CellListCallback) -> SubscriptionId;
    fn remove_cells_listener(&self, id: SubscriptionId);

    fn on_kernel_changed(&self, callback: KernelChangedCallback) -> SubscriptionId;
    fn remove_kernel_listener(&self, id: SubscriptionId);
}
