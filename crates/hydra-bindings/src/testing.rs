//! Mock implementations of the external-collaborator traits, shared by the
//! module tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::assignment::{CellDisplayState, CellRenderer};
use crate::binding::{Binding, BindingConnection, BindingState};
use crate::document::{
    CellListCallback, CellListChange, CellType, KernelChangedCallback, MetadataCallback,
    NotebookCell, NotebookDocument,
};
use crate::observe::{Listeners, SubscriptionId};
use crate::status_panel::{PanelRenderer, Workspace};
use crate::transport::{
    ConnectionStatus, DisposedCallback, KernelConnection, StatusCallback, SubChannel,
};

/// A connected local binding with the given name.
pub(crate) fn binding(name: &str) -> Binding {
    Binding {
        name: name.to_string(),
        kernel_type: Some("bash".to_string()),
        mime_type: None,
        connection: BindingConnection::Local,
        state: BindingState::Connected,
        progress: None,
    }
}

// ── Kernel connection ────────────────────────────────────────────────

/// The test harness's ends of one opened sub-channel: feed the front-end via
/// `inbound`, observe what it sent via `outbound`.
pub(crate) struct ChannelEndpoints {
    pub name: String,
    pub inbound: mpsc::UnboundedSender<Value>,
    pub outbound: mpsc::UnboundedReceiver<Value>,
}

pub(crate) struct MockKernelConnection {
    supports_channels: bool,
    opens: AtomicUsize,
    endpoints: Mutex<Vec<ChannelEndpoints>>,
    status_listeners: Listeners<ConnectionStatus>,
    disposed_listeners: Listeners<()>,
}

impl MockKernelConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            supports_channels: true,
            opens: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
            status_listeners: Listeners::new(),
            disposed_listeners: Listeners::new(),
        })
    }

    /// An older kernel whose transport has no sub-channel support.
    pub fn without_channels() -> Arc<Self> {
        Arc::new(Self {
            supports_channels: false,
            opens: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
            status_listeners: Listeners::new(),
            disposed_listeners: Listeners::new(),
        })
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.status_listeners.emit(&status);
    }

    /// Simulate the host disposing this connection object.
    pub fn dispose(&self) {
        self.disposed_listeners.emit(&());
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Take the most recently opened channel's harness endpoints.
    pub fn take_endpoints(&self) -> Option<ChannelEndpoints> {
        self.endpoints.lock().unwrap().pop()
    }

    pub fn status_listener_count(&self) -> usize {
        self.status_listeners.len()
    }

    pub fn disposed_listener_count(&self) -> usize {
        self.disposed_listeners.len()
    }
}

impl KernelConnection for MockKernelConnection {
    fn open_channel(&self, name: &str) -> Option<SubChannel> {
        if !self.supports_channels {
            return None;
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        self.endpoints.lock().unwrap().push(ChannelEndpoints {
            name: name.to_string(),
            inbound: inbound_tx,
            outbound: outbound_rx,
        });
        Some(SubChannel {
            sender: outbound_tx,
            receiver: inbound_rx,
        })
    }

    fn on_status_changed(&self, callback: StatusCallback) -> SubscriptionId {
        self.status_listeners.subscribe(move |status| callback(*status))
    }

    fn remove_status_listener(&self, id: SubscriptionId) {
        self.status_listeners.unsubscribe(id);
    }

    fn on_disposed(&self, callback: DisposedCallback) -> SubscriptionId {
        self.disposed_listeners.subscribe(move |_| callback())
    }

    fn remove_disposed_listener(&self, id: SubscriptionId) {
        self.disposed_listeners.unsubscribe(id);
    }
}

// ── Document model ───────────────────────────────────────────────────

pub(crate) struct MockCell {
    id: String,
    cell_type: CellType,
    source: Mutex<String>,
    metadata: Mutex<HashMap<String, Value>>,
    metadata_listeners: Listeners<String>,
}

impl MockCell {
    pub fn new(cell_type: CellType, source: &str) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            cell_type,
            source: Mutex::new(source.to_string()),
            metadata: Mutex::new(HashMap::new()),
            metadata_listeners: Listeners::new(),
        })
    }

    pub fn metadata_listener_count(&self) -> usize {
        self.metadata_listeners.len()
    }
}

impl NotebookCell for MockCell {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn cell_type(&self) -> CellType {
        self.cell_type
    }

    fn source(&self) -> String {
        self.source.lock().unwrap().clone()
    }

    fn get_metadata(&self, key: &str) -> Option<Value> {
        self.metadata.lock().unwrap().get(key).cloned()
    }

    fn set_metadata(&self, key: &str, value: Value) {
        self.metadata.lock().unwrap().insert(key.to_string(), value);
        self.metadata_listeners.emit(&key.to_string());
    }

    fn remove_metadata(&self, key: &str) {
        if self.metadata.lock().unwrap().remove(key).is_some() {
            self.metadata_listeners.emit(&key.to_string());
        }
    }

    fn on_metadata_changed(&self, callback: MetadataCallback) -> SubscriptionId {
        self.metadata_listeners.subscribe(move |key| callback(key))
    }

    fn remove_metadata_listener(&self, id: SubscriptionId) {
        self.metadata_listeners.unsubscribe(id);
    }
}

pub(crate) struct MockNotebook {
    cells: Mutex<Vec<Arc<dyn NotebookCell>>>,
    kernel: Mutex<Option<Arc<dyn KernelConnection>>>,
    cell_listeners: Listeners<CellListChange>,
    kernel_listeners: Listeners<()>,
}

impl MockNotebook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cells: Mutex::new(Vec::new()),
            kernel: Mutex::new(None),
            cell_listeners: Listeners::new(),
            kernel_listeners: Listeners::new(),
        })
    }

    /// Append a cell and fire the add notification, like a document model
    /// inserting at the end.
    pub fn add_cell(&self, cell: Arc<MockCell>) -> Arc<dyn NotebookCell> {
        let cell: Arc<dyn NotebookCell> = cell;
        let index = {
            let mut cells = self.cells.lock().unwrap();
            cells.push(Arc::clone(&cell));
            cells.len() - 1
        };
        self.cell_listeners.emit(&CellListChange::Added {
            index,
            cell: Arc::clone(&cell),
        });
        cell
    }

    pub fn set_kernel(&self, kernel: Option<Arc<dyn KernelConnection>>) {
        *self.kernel.lock().unwrap() = kernel;
        self.kernel_listeners.emit(&());
    }

    pub fn kernel_listener_count(&self) -> usize {
        self.kernel_listeners.len()
    }
}

impl NotebookDocument for MockNotebook {
    fn cells(&self) -> Vec<Arc<dyn NotebookCell>> {
        self.cells.lock().unwrap().clone()
    }

    fn kernel(&self) -> Option<Arc<dyn KernelConnection>> {
        self.kernel.lock().unwrap().clone()
    }

    fn on_cells_changed(&self, callback: CellListCallback) -> SubscriptionId {
        self.cell_listeners.subscribe(move |change| callback(change))
    }

    fn remove_cells_listener(&self, id: SubscriptionId) {
        self.cell_listeners.unsubscribe(id);
    }

    fn on_kernel_changed(&self, callback: KernelChangedCallback) -> SubscriptionId {
        self.kernel_listeners.subscribe(move |_| callback())
    }

    fn remove_kernel_listener(&self, id: SubscriptionId) {
        self.kernel_listeners.unsubscribe(id);
    }
}

// ── Renderers and workspace ──────────────────────────────────────────

pub(crate) struct RecordingRenderer {
    renders: Mutex<Vec<(String, CellDisplayState)>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            renders: Mutex::new(Vec::new()),
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.renders.lock().unwrap().clear();
    }

    pub fn last_state_for(&self, cell_id: &str) -> Option<CellDisplayState> {
        self.renders
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == cell_id)
            .map(|(_, state)| state.clone())
    }
}

impl CellRenderer for RecordingRenderer {
    fn render(&self, cell: &Arc<dyn NotebookCell>, state: &CellDisplayState) {
        self.renders
            .lock()
            .unwrap()
            .push((cell.id(), state.clone()));
    }
}

pub(crate) struct RecordingPanelRenderer {
    renders: Mutex<Vec<Vec<Binding>>>,
}

impl RecordingPanelRenderer {
    pub fn new() -> Self {
        Self {
            renders: Mutex::new(Vec::new()),
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.renders.lock().unwrap().clear();
    }

    pub fn last(&self) -> Option<Vec<Binding>> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl PanelRenderer for RecordingPanelRenderer {
    fn render(&self, bindings: &[Binding]) {
        self.renders.lock().unwrap().push(bindings.to_vec());
    }
}

pub(crate) struct MockWorkspace {
    current: Mutex<Option<Arc<dyn NotebookDocument>>>,
    listeners: Listeners<()>,
}

impl MockWorkspace {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(None),
            listeners: Listeners::new(),
        })
    }

    pub fn set_current(&self, notebook: Option<Arc<MockNotebook>>) {
        *self.current.lock().unwrap() =
            notebook.map(|notebook| -> Arc<dyn NotebookDocument> { notebook });
        self.listeners.emit(&());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Workspace for MockWorkspace {
    fn current_notebook(&self) -> Option<Arc<dyn NotebookDocument>> {
        self.current.lock().unwrap().clone()
    }

    fn on_current_changed(&self, callback: Box<dyn Fn() + Send + Sync>) -> SubscriptionId {
        self.listeners.subscribe(move |_| callback())
    }

    fn remove_current_listener(&self, id: SubscriptionId) {
        self.listeners.unsubscribe(id);
    }
}
