//! Read path of the binding status panel: which collection to show and when
//! to repaint it.
//!
//! The panel follows workspace focus. On every focus change it re-resolves
//! the current notebook, drops its subscriptions to the previous notebook's
//! kernel and collection (leaking a subscription to a no-longer-focused
//! notebook's collection is the defect this bookkeeping exists to prevent),
//! and subscribes to the new ones. Pixel-level rendering lives behind
//! [`PanelRenderer`].

use std::sync::{Arc, Mutex};

use crate::binding::Binding;
use crate::collection::BindingCollection;
use crate::document::NotebookDocument;
use crate::observe::SubscriptionId;
use crate::registry::BindingRegistry;

/// The workspace, as far as the panel cares: which notebook has focus.
pub trait Workspace: Send + Sync {
    fn current_notebook(&self) -> Option<Arc<dyn NotebookDocument>>;
    fn on_current_changed(&self, callback: Box<dyn Fn() + Send + Sync>) -> SubscriptionId;
    fn remove_current_listener(&self, id: SubscriptionId);
}

/// Paints the binding list. An empty slice means "no bindings available".
pub trait PanelRenderer: Send + Sync {
    fn render(&self, bindings: &[Binding]);
}

#[derive(Default)]
struct PanelState {
    focus_sub: Option<SubscriptionId>,
    document: Option<Arc<dyn NotebookDocument>>,
    kernel_sub: Option<SubscriptionId>,
    collection: Option<Arc<BindingCollection>>,
    collection_sub: Option<SubscriptionId>,
}

pub struct BindingStatusPanel {
    workspace: Arc<dyn Workspace>,
    registry: Arc<BindingRegistry>,
    renderer: Arc<dyn PanelRenderer>,
    state: Mutex<PanelState>,
}

impl BindingStatusPanel {
    pub fn new(
        workspace: Arc<dyn Workspace>,
        registry: Arc<BindingRegistry>,
        renderer: Arc<dyn PanelRenderer>,
    ) -> Arc<Self> {
        let panel = Arc::new(Self {
            workspace,
            registry,
            renderer,
            state: Mutex::new(PanelState::default()),
        });

        let focus_sub = {
            let weak = Arc::downgrade(&panel);
            panel.workspace.on_current_changed(Box::new(move || {
                if let Some(panel) = weak.upgrade() {
                    panel.handle_focus_changed();
                }
            }))
        };
        panel.state.lock().unwrap().focus_sub = Some(focus_sub);

        panel.handle_focus_changed();
        panel
    }

    fn handle_focus_changed(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            if let (Some(document), Some(sub)) = (state.document.take(), state.kernel_sub.take()) {
                document.remove_kernel_listener(sub);
            }
        }

        if let Some(document) = self.workspace.current_notebook() {
            let kernel_sub = {
                let weak = Arc::downgrade(self);
                document.on_kernel_changed(Box::new(move || {
                    if let Some(panel) = weak.upgrade() {
                        panel.handle_kernel_changed();
                    }
                }))
            };
            let mut state = self.state.lock().unwrap();
            state.document = Some(document);
            state.kernel_sub = Some(kernel_sub);
        }

        self.handle_kernel_changed();
    }

    fn handle_kernel_changed(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            if let (Some(collection), Some(sub)) =
                (state.collection.take(), state.collection_sub.take())
            {
                collection.unsubscribe(sub);
            }
        }

        let kernel = {
            let state = self.state.lock().unwrap();
            state.document.as_ref().and_then(|document| document.kernel())
        };
        if let Some(kernel) = kernel {
            let collection = self.registry.register(&kernel);
            let sub = {
                let weak = Arc::downgrade(self);
                collection.subscribe(move |_change| {
                    if let Some(panel) = weak.upgrade() {
                        panel.render();
                    }
                })
            };
            let mut state = self.state.lock().unwrap();
            state.collection = Some(collection);
            state.collection_sub = Some(sub);
        }

        self.render();
    }

    fn render(&self) {
        let bindings = {
            let state = self.state.lock().unwrap();
            state
                .collection
                .as_ref()
                .map(|collection| collection.items())
                .unwrap_or_default()
        };
        self.renderer.render(&bindings);
    }

    /// Detach from the workspace, the focused document, and its collection.
    pub fn dispose(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.focus_sub.take() {
            self.workspace.remove_current_listener(id);
        }
        if let (Some(document), Some(sub)) = (state.document.take(), state.kernel_sub.take()) {
            document.remove_kernel_listener(sub);
        }
        if let (Some(collection), Some(sub)) =
            (state.collection.take(), state.collection_sub.take())
        {
            collection.unsubscribe(sub);
        }
    }
}
