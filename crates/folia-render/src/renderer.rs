//! Reactive renderer over a [`RenderBackend`].
//!
//! ## Overview
//!
//! [`Renderer::render`] mounts a [`VNode`] description: it creates backend
//! nodes, applies static parts once, and binds each reactive part to the
//! store so that only the affected property, text, or child list is patched
//! when state changes. Children updates honor the active [`RenderMode`]:
//!
//! - **FineGrained** tears the old child subtree down and mounts the new
//!   list; no diffing, maximum simplicity.
//! - **Batch** plans a keyed diff against the previous list and patches
//!   reusable nodes in place, preserving node identity across reorders.
//!
//! Both modes produce the same final tree for the same state; they differ
//! only in which backend mutations get issued. A failed batch reconciliation
//! falls back to the fine-grained path for that subtree and that cycle.
//!
//! Every mounted node owns a record of its subscriptions and children, so
//! [`Renderer::cleanup`] can release a subtree exactly once no matter how
//! often it is called.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use folia_state::{Context, PathStore, SubscriptionId};
use tracing::warn;

use crate::backend::{RenderBackend, TreeBackend};
use crate::error::RenderError;
use crate::reconcile::{self, PlanEntry};
use crate::vdom::{display_text, ChildrenFn, ChildrenSpec, ChildrenValue, Prop, ReactiveFn, VNode};

/// Identifier for one mounted node's bookkeeping record.
pub type NodeKey = usize;

/// Children-update strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
	/// Teardown-and-rebuild on every children change.
	#[default]
	FineGrained,
	/// Keyed diff that patches and reorders existing nodes in place.
	Batch,
}

/// Renderer construction options.
#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
	pub mode: RenderMode,
}

struct NodeRecord<H> {
	handle: H,
	/// Subscriptions owned by this node's own bindings (not its children's).
	subscriptions: Vec<SubscriptionId>,
	/// Mounted child records, in display order.
	children: Vec<NodeKey>,
	/// The descriptions the current children were rendered from; the old
	/// side of the next keyed diff.
	child_nodes: Vec<VNode>,
	/// Whether the last children update wrote text content instead of a
	/// node list. Gates clearing that text on the way back to nodes, so a
	/// sibling text binding on the same node is never clobbered.
	children_text: bool,
}

/// Reactive renderer bound to one store and one backend.
pub struct Renderer<B: RenderBackend> {
	inner: Rc<RendererInner<B>>,
}

struct RendererInner<B: RenderBackend> {
	store: Rc<PathStore>,
	backend: RefCell<B>,
	records: RefCell<HashMap<NodeKey, NodeRecord<B::Handle>>>,
	next_key: Cell<NodeKey>,
	mode: Cell<RenderMode>,
	/// Self-reference handed to binding callbacks; Weak so the subscription
	/// graph never keeps the renderer alive.
	weak: Weak<RendererInner<B>>,
}

impl<B: RenderBackend + 'static> Renderer<B> {
	pub fn new(store: Rc<PathStore>, backend: B, config: RendererConfig) -> Self {
		Self {
			inner: Rc::new_cyclic(|weak| RendererInner {
				store,
				backend: RefCell::new(backend),
				records: RefCell::new(HashMap::new()),
				next_key: Cell::new(0),
				mode: Cell::new(config.mode),
				weak: weak.clone(),
			}),
		}
	}

	/// Mounts `node`, appending it to `parent` when given.
	///
	/// Static parts are applied once; reactive parts are evaluated
	/// immediately and re-evaluated whenever a dependency changes.
	pub fn render(&self, node: &VNode, parent: Option<&B::Handle>) -> NodeKey {
		self.inner.render_node(node, parent)
	}

	/// Binds the reactive parts of `node` onto an externally created
	/// backend node instead of creating one. Used to hydrate trees built
	/// outside the renderer.
	pub fn enhance(&self, handle: B::Handle, node: &VNode) -> NodeKey {
		self.inner.enhance_node(handle, node)
	}

	/// Releases `key`'s subtree: unregisters every subscription in it and
	/// detaches the root node. Safe to call repeatedly.
	pub fn cleanup(&self, key: NodeKey) {
		self.inner.cleanup_node(key, true);
	}

	/// The backend handle for a mounted node, if still mounted.
	pub fn handle(&self, key: NodeKey) -> Option<B::Handle> {
		self.inner.handle_of(key)
	}

	pub fn mode(&self) -> RenderMode {
		self.inner.mode.get()
	}

	/// Switches the children-update strategy. Takes effect from the next
	/// children change; already-mounted nodes are left as they are.
	pub fn set_mode(&self, mode: RenderMode) {
		self.inner.mode.set(mode);
	}

	pub fn store(&self) -> &Rc<PathStore> {
		&self.inner.store
	}

	pub fn context(&self) -> Context {
		self.inner.context()
	}

	/// Read access to the backend, for inspection and serialization.
	pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
		f(&self.inner.backend.borrow())
	}
}

impl Renderer<TreeBackend> {
	/// Serializes a mounted subtree as markup. `None` if `key` is not
	/// mounted.
	pub fn render_to_string(&self, key: NodeKey) -> Option<String> {
		let handle = self.handle(key)?;
		Some(self.with_backend(|backend| backend.render_to_string(handle)))
	}
}

impl<B: RenderBackend + 'static> RendererInner<B> {
	fn context(&self) -> Context {
		Context::new(self.store.clone())
	}

	fn alloc_key(&self) -> NodeKey {
		let key = self.next_key.get();
		self.next_key.set(key + 1);
		key
	}

	fn handle_of(&self, key: NodeKey) -> Option<B::Handle> {
		self.records.borrow().get(&key).map(|record| record.handle.clone())
	}

	fn render_node(&self, node: &VNode, parent: Option<&B::Handle>) -> NodeKey {
		let handle = self.backend.borrow_mut().create_node(&node.tag);
		if let Some(parent) = parent {
			self.backend.borrow_mut().append_child(parent, &handle);
		}
		self.mount(handle, node)
	}

	fn enhance_node(&self, handle: B::Handle, node: &VNode) -> NodeKey {
		self.mount(handle, node)
	}

	fn mount(&self, handle: B::Handle, node: &VNode) -> NodeKey {
		let key = self.alloc_key();
		self.records.borrow_mut().insert(
			key,
			NodeRecord {
				handle,
				subscriptions: Vec::new(),
				children: Vec::new(),
				child_nodes: Vec::new(),
				children_text: false,
			},
		);
		self.bind_node(key, node);
		key
	}

	/// Applies `node`'s props, text, and children to the record at `key`,
	/// in declaration order.
	fn bind_node(&self, key: NodeKey, node: &VNode) {
		let Some(handle) = self.handle_of(key) else {
			return;
		};
		for (name, prop) in &node.props {
			match prop {
				Prop::Static(value) => {
					self.backend.borrow_mut().set_attribute(&handle, name, value);
				}
				Prop::Reactive(f) => self.bind_prop(key, name, f.clone()),
			}
		}
		match &node.text {
			Some(Prop::Static(value)) => {
				self.backend.borrow_mut().set_text(&handle, Some(&display_text(value)));
			}
			Some(Prop::Reactive(f)) => self.bind_text(key, f.clone()),
			None => {}
		}
		match &node.children {
			None => {}
			Some(ChildrenSpec::Static(children)) => {
				let child_keys: Vec<NodeKey> = children
					.iter()
					.map(|child| self.render_node(child, Some(&handle)))
					.collect();
				if let Some(record) = self.records.borrow_mut().get_mut(&key) {
					record.children = child_keys;
					record.child_nodes = children.clone();
				}
			}
			Some(ChildrenSpec::Reactive(f)) => self.bind_children(key, f.clone()),
		}
	}

	fn track_subscription(&self, key: NodeKey, id: SubscriptionId) {
		match self.records.borrow_mut().get_mut(&key) {
			Some(record) => record.subscriptions.push(id),
			// Record was cleaned up between binding steps.
			None => self.store.subscriptions().unregister_all(id),
		}
	}

	fn bind_prop(&self, key: NodeKey, name: &str, f: ReactiveFn) {
		let id = self.store.subscriptions().create();
		let weak = self.weak.clone();
		let prop_name = name.to_string();
		let fun = f.clone();
		self.store.subscriptions().set_callback(
			id,
			Rc::new(move |_| {
				if let Some(inner) = weak.upgrade() {
					inner.refresh_prop(key, &prop_name, &fun, id);
				}
			}),
		);
		self.track_subscription(key, id);
		self.refresh_prop(key, name, &f, id);
	}

	/// Re-evaluates a reactive property, applies the result, and rebinds the
	/// subscription to the paths the evaluation actually read.
	fn refresh_prop(&self, key: NodeKey, name: &str, f: &ReactiveFn, id: SubscriptionId) {
		let Some(handle) = self.handle_of(key) else {
			return;
		};
		let ctx = self.context();
		let (result, deps) = self.store.track(|| f(&ctx));
		match result {
			Ok(value) => self.backend.borrow_mut().set_attribute(&handle, name, &value),
			Err(error) => {
				warn!(node = key, property = %name, error = %error, "reactive property failed; keeping last value");
			}
		}
		self.store.subscriptions().rebind(id, &deps);
	}

	fn bind_text(&self, key: NodeKey, f: ReactiveFn) {
		let id = self.store.subscriptions().create();
		let weak = self.weak.clone();
		let fun = f.clone();
		self.store.subscriptions().set_callback(
			id,
			Rc::new(move |_| {
				if let Some(inner) = weak.upgrade() {
					inner.refresh_text(key, &fun, id);
				}
			}),
		);
		self.track_subscription(key, id);
		self.refresh_text(key, &f, id);
	}

	fn refresh_text(&self, key: NodeKey, f: &ReactiveFn, id: SubscriptionId) {
		let Some(handle) = self.handle_of(key) else {
			return;
		};
		let ctx = self.context();
		let (result, deps) = self.store.track(|| f(&ctx));
		match result {
			Ok(value) => {
				self.backend.borrow_mut().set_text(&handle, Some(&display_text(&value)));
			}
			Err(error) => {
				warn!(node = key, error = %error, "reactive text failed; keeping last value");
			}
		}
		self.store.subscriptions().rebind(id, &deps);
	}

	fn bind_children(&self, key: NodeKey, f: ChildrenFn) {
		let id = self.store.subscriptions().create();
		let weak = self.weak.clone();
		let fun = f.clone();
		self.store.subscriptions().set_callback(
			id,
			Rc::new(move |_| {
				if let Some(inner) = weak.upgrade() {
					inner.refresh_children(key, &fun, id);
				}
			}),
		);
		self.track_subscription(key, id);
		self.refresh_children(key, &f, id);
	}

	fn refresh_children(&self, key: NodeKey, f: &ChildrenFn, id: SubscriptionId) {
		if !self.records.borrow().contains_key(&key) {
			return;
		}
		let ctx = self.context();
		let (result, deps) = self.store.track(|| f(&ctx));
		match result {
			Ok(ChildrenValue::Ignore) => {}
			Ok(ChildrenValue::Text(value)) => self.set_text_children(key, &value),
			Ok(ChildrenValue::Nodes(children)) => self.apply_child_list(key, &children),
			Err(error) => {
				warn!(node = key, error = %error, "children function failed; keeping current subtree");
			}
		}
		self.store.subscriptions().rebind(id, &deps);
	}

	fn set_text_children(&self, key: NodeKey, value: &serde_json::Value) {
		self.clear_children(key);
		let Some(handle) = self.handle_of(key) else {
			return;
		};
		let text = if value.is_null() {
			None
		} else {
			Some(display_text(value))
		};
		self.backend.borrow_mut().set_text(&handle, text.as_deref());
		if let Some(record) = self.records.borrow_mut().get_mut(&key) {
			record.children_text = true;
		}
	}

	/// Clears node text left behind by a text-valued children update, once.
	fn clear_children_text(&self, key: NodeKey) {
		match self.records.borrow_mut().get_mut(&key) {
			Some(record) if record.children_text => record.children_text = false,
			_ => return,
		}
		if let Some(handle) = self.handle_of(key) {
			self.backend.borrow_mut().set_text(&handle, None);
		}
	}

	fn apply_child_list(&self, key: NodeKey, new_children: &[VNode]) {
		let has_previous = self
			.records
			.borrow()
			.get(&key)
			.map(|record| !record.children.is_empty() || !record.child_nodes.is_empty())
			.unwrap_or(false);
		if self.mode.get() == RenderMode::Batch && has_previous {
			if let Err(error) = self.reconcile_children(key, new_children) {
				warn!(node = key, error = %error, "batch reconciliation failed; rebuilding subtree");
				self.rebuild_children(key, new_children);
			}
		} else {
			self.rebuild_children(key, new_children);
		}
	}

	/// Fine-grained children update: release the old subtree, mount the new
	/// list from scratch.
	fn rebuild_children(&self, key: NodeKey, new_children: &[VNode]) {
		self.clear_children_text(key);
		self.clear_children(key);
		let Some(handle) = self.handle_of(key) else {
			return;
		};
		let child_keys: Vec<NodeKey> = new_children
			.iter()
			.map(|child| self.render_node(child, Some(&handle)))
			.collect();
		if let Some(record) = self.records.borrow_mut().get_mut(&key) {
			record.children = child_keys;
			record.child_nodes = new_children.to_vec();
		}
	}

	/// Batch children update: plan a keyed diff, validate it against the
	/// record table, then patch in place. Nothing is mutated before the plan
	/// is validated, so an error here leaves the subtree untouched.
	fn reconcile_children(&self, key: NodeKey, new_children: &[VNode]) -> Result<(), RenderError> {
		let (old_nodes, old_keys, parent_handle) = {
			let records = self.records.borrow();
			let record = records.get(&key).ok_or(RenderError::MissingRecord(key))?;
			(
				record.child_nodes.clone(),
				record.children.clone(),
				record.handle.clone(),
			)
		};
		let plan = reconcile::plan_children(&old_nodes, new_children);
		for entry in &plan.entries {
			if let PlanEntry::Reuse { old_index } = entry {
				let child_key = *old_keys.get(*old_index).ok_or(RenderError::MissingRecord(key))?;
				if !self.records.borrow().contains_key(&child_key) {
					return Err(RenderError::MissingRecord(child_key));
				}
			}
		}

		// Plan validated; safe to mutate from here.
		self.clear_children_text(key);
		let mut used_old = HashSet::new();
		let mut new_keys = Vec::with_capacity(new_children.len());
		for (slot, entry) in plan.entries.iter().enumerate() {
			match entry {
				PlanEntry::Reuse { old_index } => {
					used_old.insert(*old_index);
					let child_key = old_keys[*old_index];
					self.patch_node(child_key, &old_nodes[*old_index], &new_children[slot]);
					new_keys.push(child_key);
				}
				PlanEntry::Fresh => {
					new_keys.push(self.render_node(&new_children[slot], Some(&parent_handle)));
				}
			}
		}
		for (old_index, child_key) in old_keys.iter().enumerate() {
			if !used_old.contains(&old_index) {
				self.cleanup_node(*child_key, true);
			}
		}
		// Reorder to final positions; insert_child moves already-attached
		// nodes, so reused handles keep their identity.
		for (index, child_key) in new_keys.iter().enumerate() {
			if let Some(handle) = self.handle_of(*child_key) {
				self.backend.borrow_mut().insert_child(&parent_handle, &handle, index);
			}
		}
		if let Some(record) = self.records.borrow_mut().get_mut(&key) {
			record.children = new_keys;
			record.child_nodes = new_children.to_vec();
		}
		Ok(())
	}

	/// Patches a reused node in place: its own subscriptions are replaced,
	/// stale properties removed, and content re-bound from `new`.
	fn patch_node(&self, key: NodeKey, old: &VNode, new: &VNode) {
		let Some(handle) = self.handle_of(key) else {
			return;
		};
		let old_subs = match self.records.borrow_mut().get_mut(&key) {
			Some(record) => std::mem::take(&mut record.subscriptions),
			None => return,
		};
		for id in old_subs {
			self.store.subscriptions().unregister_all(id);
		}

		let new_names: HashSet<&str> = new.props.iter().map(|(name, _)| name.as_str()).collect();
		for (name, _) in &old.props {
			if !new_names.contains(name.as_str()) {
				self.backend.borrow_mut().remove_attribute(&handle, name);
			}
		}
		for (name, prop) in &new.props {
			match prop {
				Prop::Static(value) => {
					let unchanged = old.props.iter().any(|(old_name, old_prop)| {
						old_name == name
							&& matches!(old_prop, Prop::Static(old_value) if old_value == value)
					});
					if !unchanged {
						self.backend.borrow_mut().set_attribute(&handle, name, value);
					}
				}
				Prop::Reactive(f) => self.bind_prop(key, name, f.clone()),
			}
		}

		match &new.text {
			Some(Prop::Static(value)) => {
				self.backend.borrow_mut().set_text(&handle, Some(&display_text(value)));
			}
			Some(Prop::Reactive(f)) => self.bind_text(key, f.clone()),
			None => {
				if old.text.is_some() {
					self.backend.borrow_mut().set_text(&handle, None);
				}
			}
		}

		match &new.children {
			None => {
				if old.children.is_some() {
					self.clear_children(key);
				}
			}
			Some(ChildrenSpec::Static(children)) => {
				if let Err(error) = self.reconcile_children(key, children) {
					warn!(node = key, error = %error, "child reconciliation failed; rebuilding subtree");
					self.rebuild_children(key, children);
				}
			}
			Some(ChildrenSpec::Reactive(f)) => self.bind_children(key, f.clone()),
		}
	}

	fn clear_children(&self, key: NodeKey) {
		let child_keys = match self.records.borrow_mut().get_mut(&key) {
			Some(record) => {
				record.child_nodes.clear();
				std::mem::take(&mut record.children)
			}
			None => return,
		};
		for child_key in child_keys {
			self.cleanup_node(child_key, true);
		}
	}

	/// Removes `key`'s record, unregisters its subscriptions, and recurses
	/// into its children. An already-released key is a no-op, so repeated
	/// cleanup of the same subtree is safe.
	fn cleanup_node(&self, key: NodeKey, detach: bool) {
		let record = self.records.borrow_mut().remove(&key);
		let Some(record) = record else {
			return;
		};
		for id in &record.subscriptions {
			self.store.subscriptions().unregister_all(*id);
		}
		// Descendants are destroyed with the subtree; only the root of the
		// cleanup needs an explicit detach.
		for child_key in &record.children {
			self.cleanup_node(*child_key, false);
		}
		if detach {
			self.backend.borrow_mut().detach(&record.handle);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use folia_state::store::StoreConfig;
	use rstest::rstest;
	use serde_json::{json, Value};

	fn renderer(mode: RenderMode) -> Renderer<TreeBackend> {
		let store = PathStore::create(StoreConfig::default());
		Renderer::new(store, TreeBackend::new(), RendererConfig { mode })
	}

	#[rstest]
	fn static_tree_renders_once() {
		let r = renderer(RenderMode::FineGrained);
		let key = r.render(
			&VNode::new("div")
				.attr("class", "app")
				.child(VNode::new("span").text("hello")),
			None,
		);
		assert_eq!(
			r.render_to_string(key).unwrap(),
			r#"<div class="app"><span>hello</span></div>"#
		);
	}

	#[rstest]
	fn reactive_text_updates_on_state_change() {
		let r = renderer(RenderMode::FineGrained);
		let key = r.render(
			&VNode::new("span").text_fn(|ctx| ctx.get_state("count", json!(0))),
			None,
		);
		assert_eq!(r.render_to_string(key).unwrap(), "<span>0</span>");

		r.store().set("count", json!(7));
		assert_eq!(r.render_to_string(key).unwrap(), "<span>7</span>");
	}

	#[rstest]
	fn reactive_prop_updates_only_that_prop() {
		let r = renderer(RenderMode::FineGrained);
		let key = r.render(
			&VNode::new("div")
				.attr("id", "fixed")
				.attr_fn("class", |ctx| ctx.get_state("theme", json!("light"))),
			None,
		);
		let handle = r.handle(key).unwrap();
		assert_eq!(
			r.with_backend(|b| b.attr(handle, "class").cloned()),
			Some(json!("light"))
		);

		r.store().set("theme", json!("dark"));
		assert_eq!(
			r.with_backend(|b| b.attr(handle, "class").cloned()),
			Some(json!("dark"))
		);
		assert_eq!(
			r.with_backend(|b| b.attr(handle, "id").cloned()),
			Some(json!("fixed"))
		);
	}

	#[rstest]
	fn failing_prop_keeps_last_value() {
		let r = renderer(RenderMode::FineGrained);
		let mut node = VNode::new("div");
		node.props.push((
			"class".to_string(),
			Prop::try_reactive(|ctx| {
				let value = ctx.get_state("theme", Value::Null);
				match value {
					Value::String(theme) => Ok(Value::String(theme)),
					_ => Err("theme must be a string".into()),
				}
			}),
		));
		r.store().set("theme", json!("light"));
		let key = r.render(&node, None);
		let handle = r.handle(key).unwrap();
		assert_eq!(
			r.with_backend(|b| b.attr(handle, "class").cloned()),
			Some(json!("light"))
		);

		// A bad value fails the binding; the last good value stays applied.
		r.store().set("theme", json!(42));
		assert_eq!(
			r.with_backend(|b| b.attr(handle, "class").cloned()),
			Some(json!("light"))
		);

		// Recovery on the next good value.
		r.store().set("theme", json!("dark"));
		assert_eq!(
			r.with_backend(|b| b.attr(handle, "class").cloned()),
			Some(json!("dark"))
		);
	}

	fn item_list(ctx: &Context) -> ChildrenValue {
		let items = ctx.get_state("items", json!([]));
		let nodes = items
			.as_array()
			.map(|items| {
				items
					.iter()
					.map(|item| {
						let label = display_text(item);
						VNode::new("li").key(label.clone()).text(label)
					})
					.collect()
			})
			.unwrap_or_default();
		ChildrenValue::Nodes(nodes)
	}

	#[rstest]
	#[case::fine_grained(RenderMode::FineGrained)]
	#[case::batch(RenderMode::Batch)]
	fn modes_produce_identical_output(#[case] mode: RenderMode) {
		let r = renderer(mode);
		r.store().set("items", json!(["a", "b", "c"]));
		let key = r.render(&VNode::new("ul").children_fn(item_list), None);
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<ul><li>a</li><li>b</li><li>c</li></ul>"
		);

		r.store().set("items", json!(["c", "a", "d"]));
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<ul><li>c</li><li>a</li><li>d</li></ul>"
		);
	}

	#[rstest]
	fn batch_reorder_preserves_node_identity() {
		let r = renderer(RenderMode::Batch);
		r.store().set("items", json!(["a", "b", "c"]));
		let key = r.render(&VNode::new("ul").children_fn(item_list), None);
		let parent = r.handle(key).unwrap();
		let before = r.with_backend(|b| b.children(parent));

		r.store().set("items", json!(["c", "a", "b"]));
		let after = r.with_backend(|b| b.children(parent));

		assert_eq!(after.len(), 3);
		assert_eq!(after[0], before[2]);
		assert_eq!(after[1], before[0]);
		assert_eq!(after[2], before[1]);
	}

	#[rstest]
	fn fine_grained_rebuild_replaces_nodes() {
		let r = renderer(RenderMode::FineGrained);
		r.store().set("items", json!(["a", "b"]));
		let key = r.render(&VNode::new("ul").children_fn(item_list), None);
		let parent = r.handle(key).unwrap();
		let before = r.with_backend(|b| b.children(parent));

		r.store().set("items", json!(["b", "a"]));
		let after = r.with_backend(|b| b.children(parent));
		assert!(before.iter().all(|handle| !after.contains(handle)));
	}

	#[rstest]
	fn removed_child_subscriptions_are_released() {
		let r = renderer(RenderMode::Batch);
		r.store().set("items", json!(["a"]));
		let key = r.render(
			&VNode::new("ul").children_fn(|ctx| {
				let items = ctx.get_state("items", json!([]));
				let nodes = items
					.as_array()
					.map(|items| {
						items
							.iter()
							.map(|item| {
								let label = display_text(item);
								let path = format!("labels.{label}");
								VNode::new("li")
									.key(label)
									.text_fn(move |ctx| ctx.get_state(&path, json!("")))
							})
							.collect()
					})
					.unwrap_or_default();
				ChildrenValue::Nodes(nodes)
			}),
			None,
		);
		assert!(r.store().subscriptions().subscriber_count("labels.a") > 0);

		r.store().set("items", json!([]));
		assert_eq!(r.store().subscriptions().subscriber_count("labels.a"), 0);
		assert_eq!(r.render_to_string(key).unwrap(), "<ul></ul>");
	}

	#[rstest]
	fn failed_reconciliation_falls_back_to_rebuild() {
		let r = renderer(RenderMode::Batch);
		r.store().set("items", json!(["a", "b"]));
		let key = r.render(&VNode::new("ul").children_fn(item_list), None);

		// Release one child out from under the renderer; the next diff finds
		// its record missing and must rebuild instead of patching.
		let parent = r.handle(key).unwrap();
		let orphan = r.with_backend(|b| b.children(parent))[0];
		let records: Vec<NodeKey> = (0..r.inner.next_key.get())
			.filter(|k| r.handle(*k) == Some(orphan))
			.collect();
		r.cleanup(records[0]);

		r.store().set("items", json!(["b", "a"]));
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<ul><li>b</li><li>a</li></ul>"
		);
	}

	#[rstest]
	#[case::fine_grained(RenderMode::FineGrained)]
	#[case::batch(RenderMode::Batch)]
	fn children_text_value_replaces_subtree(#[case] mode: RenderMode) {
		let r = renderer(mode);
		r.store().set("message", json!("loading"));
		let key = r.render(
			&VNode::new("div").children_fn(|ctx| {
				let message = ctx.get_state("message", Value::Null);
				if message.is_null() {
					ChildrenValue::Nodes(vec![VNode::new("span").text("ready")])
				} else {
					ChildrenValue::Text(message)
				}
			}),
			None,
		);
		assert_eq!(r.render_to_string(key).unwrap(), "<div>loading</div>");

		r.store().set("message", Value::Null);
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<div><span>ready</span></div>"
		);
	}

	#[rstest]
	fn children_node_update_preserves_sibling_text() {
		let r = renderer(RenderMode::FineGrained);
		r.store().set("items", json!(["a"]));
		let key = r.render(
			&VNode::new("ul").text("heading").children_fn(item_list),
			None,
		);
		assert_eq!(r.render_to_string(key).unwrap(), "<ul>heading<li>a</li></ul>");

		// Rebuilding the child list must not wipe text the children
		// function never wrote.
		r.store().set("items", json!(["a", "b"]));
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<ul>heading<li>a</li><li>b</li></ul>"
		);
	}

	#[rstest]
	fn children_ignore_leaves_subtree_untouched() {
		let r = renderer(RenderMode::FineGrained);
		r.store().set("gate", json!(true));
		let key = r.render(
			&VNode::new("div").children_fn(|ctx| {
				if ctx.get_state("gate", json!(false)) == json!(true) {
					ChildrenValue::Nodes(vec![VNode::new("span").text("kept")])
				} else {
					ChildrenValue::Ignore
				}
			}),
			None,
		);
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<div><span>kept</span></div>"
		);

		r.store().set("gate", json!(false));
		assert_eq!(
			r.render_to_string(key).unwrap(),
			"<div><span>kept</span></div>"
		);
	}

	#[rstest]
	fn cleanup_is_idempotent_and_stops_updates() {
		let r = renderer(RenderMode::FineGrained);
		let key = r.render(
			&VNode::new("span").text_fn(|ctx| ctx.get_state("count", json!(0))),
			None,
		);
		r.cleanup(key);
		r.cleanup(key);
		assert!(r.handle(key).is_none());
		assert_eq!(r.store().subscriptions().subscriber_count("count"), 0);

		// Further writes are harmless.
		r.store().set("count", json!(9));
	}

	#[rstest]
	fn enhance_binds_reactivity_to_external_node() {
		let store = PathStore::create(StoreConfig::default());
		let mut backend = TreeBackend::new();
		let external = backend.create_node("div");
		let r = Renderer::new(store, backend, RendererConfig::default());

		let key = r.enhance(
			external,
			&VNode::new("div").attr_fn("class", |ctx| ctx.get_state("theme", json!("light"))),
		);
		assert_eq!(r.handle(key), Some(external));
		assert_eq!(
			r.with_backend(|b| b.attr(external, "class").cloned()),
			Some(json!("light"))
		);

		r.store().set("theme", json!("dark"));
		assert_eq!(
			r.with_backend(|b| b.attr(external, "class").cloned()),
			Some(json!("dark"))
		);
	}

	#[rstest]
	fn mode_switch_applies_to_next_update() {
		let r = renderer(RenderMode::FineGrained);
		r.store().set("items", json!(["a", "b"]));
		let key = r.render(&VNode::new("ul").children_fn(item_list), None);
		let parent = r.handle(key).unwrap();

		r.set_mode(RenderMode::Batch);
		let before = r.with_backend(|b| b.children(parent));
		r.store().set("items", json!(["b", "a"]));
		let after = r.with_backend(|b| b.children(parent));

		assert_eq!(after[0], before[1]);
		assert_eq!(after[1], before[0]);
	}
}
