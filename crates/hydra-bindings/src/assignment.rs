//! Keeps a notebook's cell-binding assignments, the live binding collection,
//! and the visual presentation mutually consistent.
//!
//! Three independent event sources feed the controller: document cell-list
//! changes, kernel-connection changes, and binding-collection changes. A
//! stored assignment whose binding is missing from the collection is a
//! *dangling* assignment; it is preserved (the name in metadata stays
//! authoritative) and only its display degrades to the no-binding variant.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::binding::Binding;
use crate::cell_metadata::CellMetadataAdapter;
use crate::collection::BindingCollection;
use crate::document::{CellListChange, CellType, NotebookCell, NotebookDocument};
use crate::observe::SubscriptionId;
use crate::registry::BindingRegistry;

/// Number of distinct visual variants for bound cells. Bindings beyond this
/// count alias onto earlier variants; a bounded cosmetic limitation, since
/// the stored name stays authoritative.
pub const DISPLAY_VARIANTS: usize = 8;

/// Visual class for a cell, derived from its assignment and the live
/// collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayClass {
    /// Unassigned or dangling: default styling.
    NoBinding,
    /// Assigned to a live binding at collection index `i`; the class is
    /// `i % DISPLAY_VARIANTS`.
    Variant(usize),
}

/// Everything the display layer needs to paint one cell. `assigned` without
/// `binding` is the dangling case, distinct from both "no assignment" and
/// "assigned to a live binding".
#[derive(Debug, Clone)]
pub struct CellDisplayState {
    /// The stored assignment, even when no such binding currently exists.
    pub assigned: Option<String>,
    pub class: DisplayClass,
    /// The live binding, when the assigned name is present in the collection.
    pub binding: Option<Binding>,
}

impl CellDisplayState {
    pub fn is_dangling(&self) -> bool {
        self.assigned.is_some() && self.binding.is_none()
    }
}

/// Applies a display state to a cell. Pixel-level rendering lives in the
/// host; this seam is all the controller knows about it.
pub trait CellRenderer: Send + Sync {
    fn render(&self, cell: &Arc<dyn NotebookCell>, state: &CellDisplayState);
}

#[derive(Default)]
struct ControllerState {
    collection: Option<Arc<BindingCollection>>,
    collection_sub: Option<SubscriptionId>,
    cells_sub: Option<SubscriptionId>,
    kernel_sub: Option<SubscriptionId>,
}

pub struct AssignmentController {
    document: Arc<dyn NotebookDocument>,
    registry: Arc<BindingRegistry>,
    metadata: Arc<CellMetadataAdapter>,
    renderer: Arc<dyn CellRenderer>,
    state: Mutex<ControllerState>,
}

impl AssignmentController {
    /// Build a controller for one open notebook and attach it to the
    /// document's current state: existing code cells get watched and
    /// rendered, and the current kernel (if any) is registered.
    pub fn new(
        document: Arc<dyn NotebookDocument>,
        registry: Arc<BindingRegistry>,
        metadata: Arc<CellMetadataAdapter>,
        renderer: Arc<dyn CellRenderer>,
    ) -> Arc<Self> {
        let controller = Arc::new(Self {
            document,
            registry,
            metadata,
            renderer,
            state: Mutex::new(ControllerState::default()),
        });
        controller.wire();
        controller
    }

    fn wire(self: &Arc<Self>) {
        let cells_sub = {
            let controller = Arc::downgrade(self);
            self.document.on_cells_changed(Box::new(move |change| {
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                if let CellListChange::Added { index, cell } = change {
                    controller.handle_cell_added(*index, cell);
                }
            }))
        };
        let kernel_sub = {
            let controller = Arc::downgrade(self);
            self.document.on_kernel_changed(Box::new(move || {
                if let Some(controller) = controller.upgrade() {
                    controller.handle_kernel_changed();
                }
            }))
        };
        {
            let mut state = self.state.lock().unwrap();
            state.cells_sub = Some(cells_sub);
            state.kernel_sub = Some(kernel_sub);
        }

        for cell in self.document.cells() {
            if cell.cell_type() == CellType::Code {
                self.watch_cell(&cell);
            }
        }
        self.handle_kernel_changed();
    }

    /// Kernel change, including the initial attach: drop the old collection
    /// subscription, register the new kernel, subscribe, and repaint.
    fn handle_kernel_changed(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            if let (Some(collection), Some(sub)) =
                (state.collection.take(), state.collection_sub.take())
            {
                collection.unsubscribe(sub);
            }
        }

        if let Some(kernel) = self.document.kernel() {
            let collection = self.registry.register(&kernel);
            let sub = {
                let controller = Arc::downgrade(self);
                // Any binding's index or attributes may have shifted, so every
                // code cell repaints on any collection change.
                collection.subscribe(move |_change| {
                    if let Some(controller) = controller.upgrade() {
                        controller.refresh_all();
                    }
                })
            };
            let mut state = self.state.lock().unwrap();
            state.collection = Some(collection);
            state.collection_sub = Some(sub);
        }

        self.refresh_all();
    }

    fn handle_cell_added(self: &Arc<Self>, index: usize, cell: &Arc<dyn NotebookCell>) {
        if cell.cell_type() != CellType::Code {
            return;
        }
        self.watch_cell(cell);
        self.seed_assignment(index, cell);
        // Render after seeding so the seeded value's display is not stale.
        self.render_cell(cell);
    }

    /// Repaint a cell whenever its binding-name metadata changes, from any
    /// writer (toolbar action, collaborator, undo).
    fn watch_cell(self: &Arc<Self>, cell: &Arc<dyn NotebookCell>) {
        let controller = Arc::downgrade(self);
        let target = Arc::downgrade(cell);
        self.metadata.on_binding_name_changed(cell, move || {
            let (Some(controller), Some(cell)) = (controller.upgrade(), target.upgrade()) else {
                return;
            };
            controller.render_cell(&cell);
        });
    }

    /// Seed a freshly inserted cell from its predecessor: only when the cell
    /// is not first, has no assignment of its own, is empty (a pasted cell's
    /// absence of a binding is deliberate), and the preceding cell actually
    /// has an assignment.
    fn seed_assignment(&self, index: usize, cell: &Arc<dyn NotebookCell>) {
        if index == 0 {
            return;
        }
        if self.metadata.has_binding(cell) {
            return;
        }
        if !cell.source().is_empty() {
            return;
        }
        let cells = self.document.cells();
        let Some(previous) = cells.get(index - 1) else {
            return;
        };
        if let Some(name) = self.metadata.binding_name(previous) {
            debug!("seeding new cell with binding {name:?} from preceding cell");
            self.metadata.set_binding_name(cell, &name);
        }
    }

    /// Explicit user action: assign a cell to a binding by name. The write
    /// goes through metadata and the change notification repaints the cell.
    pub fn assign(&self, cell: &Arc<dyn NotebookCell>, name: &str) {
        self.metadata.set_binding_name(cell, name);
    }

    /// Explicit user action: clear a cell's assignment. This is the only
    /// path that removes an assignment; a dangling assignment is never
    /// auto-cleared.
    pub fn clear_assignment(&self, cell: &Arc<dyn NotebookCell>) {
        self.metadata.remove_binding(cell);
    }

    /// Compute the display state for one cell against the live collection.
    pub fn display_state(&self, cell: &Arc<dyn NotebookCell>) -> CellDisplayState {
        let assigned = self.metadata.binding_name(cell);
        let collection = self.state.lock().unwrap().collection.clone();

        let (class, binding) = match (&assigned, &collection) {
            (Some(name), Some(collection)) => match collection.index_of(name) {
                Some(index) => (
                    DisplayClass::Variant(index % DISPLAY_VARIANTS),
                    collection.get(name),
                ),
                None => (DisplayClass::NoBinding, None),
            },
            _ => (DisplayClass::NoBinding, None),
        };

        CellDisplayState {
            assigned,
            class,
            binding,
        }
    }

    fn render_cell(&self, cell: &Arc<dyn NotebookCell>) {
        let state = self.display_state(cell);
        self.renderer.render(cell, &state);
    }

    fn refresh_all(&self) {
        for cell in self.document.cells() {
            if cell.cell_type() == CellType::Code {
                self.render_cell(&cell);
            }
        }
    }

    /// Detach from the document and collection. Call when the notebook
    /// closes.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(id) = state.cells_sub.take() {
                self.document.remove_cells_listener(id);
            }
            if let Some(id) = state.kernel_sub.take() {
                self.document.remove_kernel_listener(id);
            }
            if let (Some(collection), Some(sub)) =
                (state.collection.take(), state.collection_sub.take())
            {
                collection.unsubscribe(sub);
            }
        }
        self.metadata.dispose();
    }
}
