//! # Folia
//!
//! A reactive UI runtime: applications describe output as plain nested data
//! ("object DOM") and Folia keeps rendered nodes consistent with a mutable,
//! path-addressed state store.
//!
//! ## Core Principles
//!
//! - **Path-addressed state**: one nested value per store, read and written
//!   through dot-delimited paths with caller-supplied defaults
//! - **Branch-aware reactivity**: a reactive function re-runs exactly when a
//!   path it read on its last execution changes, and only then
//! - **Dual-mode rendering**: fine-grained per-property patching and batch
//!   keyed reconciliation behave observably the same to application code
//! - **Explicit lifecycle**: stores and renderers are owned values, never
//!   process-wide singletons, so independent instances coexist in one process
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use folia::prelude::*;
//! use serde_json::json;
//!
//! let store = PathStore::create(StoreConfig::default());
//! let renderer = Renderer::new(store.clone(), TreeBackend::new(), RendererConfig::default());
//!
//! let key = renderer.render(
//! 	&VNode::new("div")
//! 		.attr("class", "counter")
//! 		.text_fn(|ctx| ctx.get_state("count", json!(0))),
//! 	None,
//! );
//!
//! store.set("count", json!(1));
//! assert_eq!(renderer.render_to_string(key).unwrap(), r#"<div class="counter">1</div>"#);
//! ```

pub use folia_render as render;
pub use folia_state as state;

pub use folia_render::{
	display_text, ChildrenSpec, ChildrenValue, NodeKey, Prop, PropError, RenderBackend,
	RenderError, RenderMode, Renderer, RendererConfig, TreeBackend, TreeHandle, VNode,
};
pub use folia_state::{
	Context, Middleware, MiddlewareError, Notification, NotifyPolicy, PathStore, StoreConfig,
	Unsubscribe, WriteContext, WriteOutcome,
};

pub mod component;

pub use component::{mount, render_to_string, Component};

/// Commonly used items.
pub mod prelude {
	pub use crate::component::{mount, render_to_string, Component};
	pub use folia_render::{
		ChildrenValue, RenderBackend, RenderMode, Renderer, RendererConfig, TreeBackend, VNode,
	};
	pub use folia_state::{Context, NotifyPolicy, PathStore, StoreConfig};
}
