//! hydra-bindings - Sub-kernel binding registry and cell-binding association.
//!
//! A Hydra kernel multiplexes several logical execution contexts ("bindings")
//! behind one notebook kernel connection. This crate keeps a front-end replica
//! of the kernel's binding list in sync over a named sub-channel, and keeps
//! each notebook cell's stored binding assignment consistent across cell
//! insertion, kernel replacement, and out-of-order update delivery.
//!
//! The notebook document, cell model, and kernel transport are external
//! collaborators; this crate consumes them through the traits in [`document`]
//! and [`transport`]. Composition is constructor-based: the host builds one
//! [`registry::BindingRegistry`], and passes it (plus a
//! [`cell_metadata::CellMetadataAdapter`]) into each per-notebook
//! [`assignment::AssignmentController`] and the workspace-wide
//! [`status_panel::BindingStatusPanel`].

pub mod assignment;
pub mod binding;
pub mod cell_metadata;
pub mod channel;
pub mod collection;
pub mod document;
pub mod observe;
pub mod protocol;
pub mod registry;
pub mod status_panel;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
