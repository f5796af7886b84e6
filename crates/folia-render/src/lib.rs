//! # folia-render
//!
//! Reactive object-DOM renderer for the Folia UI runtime.
//!
//! A [`VNode`] tree describes nodes whose properties, text, and children can
//! be static values or reactive functions over a
//! [`folia_state::PathStore`]. The [`Renderer`] mounts the tree onto any
//! [`RenderBackend`] and keeps it in sync with state:
//!
//! - reactive property and text bindings re-run when a dependency changes
//!   and patch exactly one node,
//! - children changes apply per the active [`RenderMode`]: fine-grained
//!   teardown-and-rebuild, or batch keyed reconciliation that preserves node
//!   identity across reorders,
//! - both modes sit behind the same contract and yield the same final tree.
//!
//! [`TreeBackend`] is the built-in in-memory backend for headless rendering
//! and tests; [`Renderer::enhance`] hydrates nodes created outside the
//! renderer.

pub mod backend;
pub mod error;
mod reconcile;
pub mod renderer;
pub mod vdom;

pub use backend::{RenderBackend, TreeBackend, TreeHandle};
pub use error::{PropError, RenderError};
pub use renderer::{NodeKey, RenderMode, Renderer, RendererConfig};
pub use vdom::{display_text, ChildrenFn, ChildrenSpec, ChildrenValue, Prop, ReactiveFn, VNode};
