//! Component boundary.
//!
//! A component is anything that can describe one object-DOM tree from a
//! [`Context`]. The core never decides component-level re-render timing; an
//! orchestration layer calls [`Component::render`] when it wants a fresh
//! tree, and reactivity inside the returned tree takes over from there.

use folia_render::{NodeKey, RenderBackend, Renderer, RendererConfig, TreeBackend, VNode};
use folia_state::{Context, PathStore, StoreConfig};
use std::rc::Rc;

/// Produces one object-DOM tree per invocation.
pub trait Component {
	fn render(&self, ctx: &Context) -> VNode;
}

impl<F> Component for F
where
	F: Fn(&Context) -> VNode,
{
	fn render(&self, ctx: &Context) -> VNode {
		self(ctx)
	}
}

/// Renders `component` once and mounts the resulting tree.
pub fn mount<B: RenderBackend + 'static>(
	renderer: &Renderer<B>,
	component: &impl Component,
	parent: Option<&B::Handle>,
) -> NodeKey {
	let node = component.render(&renderer.context());
	renderer.render(&node, parent)
}

/// Headless convenience: renders `component` against a fresh in-memory tree
/// and returns the serialized output.
pub fn render_to_string(store: Rc<PathStore>, component: &impl Component) -> String {
	let renderer = Renderer::new(store, TreeBackend::new(), RendererConfig::default());
	let key = mount(&renderer, component, None);
	renderer.render_to_string(key).unwrap_or_default()
}
