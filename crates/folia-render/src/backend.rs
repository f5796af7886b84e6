//! Object-node backends.
//!
//! The renderer drives concrete node trees through the [`RenderBackend`]
//! trait. Fine-grained patching and batch reconciliation both reduce to the
//! same small mutation set, so a backend only needs create/attribute/text
//! and child-list operations. [`TreeBackend`] is the built-in in-memory
//! implementation used for headless rendering and tests.

use std::collections::BTreeMap;

use serde_json::Value;

/// Mutation surface over a concrete node tree.
pub trait RenderBackend {
	/// Stable reference to one node. Equality is node identity.
	type Handle: Clone + PartialEq + std::fmt::Debug;

	/// Creates a detached node with the given tag.
	fn create_node(&mut self, tag: &str) -> Self::Handle;

	/// Sets or replaces a named property on `node`.
	fn set_attribute(&mut self, node: &Self::Handle, name: &str, value: &Value);

	/// Removes a named property. Absent names are a no-op.
	fn remove_attribute(&mut self, node: &Self::Handle, name: &str);

	/// Sets the node's text content; `None` clears it.
	fn set_text(&mut self, node: &Self::Handle, text: Option<&str>);

	/// Appends `child` at the end of `parent`'s child list.
	fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

	/// Places `child` at `index` in `parent`'s child list, moving it from
	/// its current position (or parent) if already attached.
	fn insert_child(&mut self, parent: &Self::Handle, child: &Self::Handle, index: usize);

	/// Removes `child` from `parent` without destroying it.
	fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

	/// Unlinks `node` from whatever parent it has. Detached nodes are a
	/// no-op.
	fn detach(&mut self, node: &Self::Handle);
}

/// Handle into a [`TreeBackend`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeHandle(usize);

#[derive(Debug)]
struct TreeNode {
	tag: String,
	// BTreeMap keeps serialized attribute order deterministic.
	attrs: BTreeMap<String, Value>,
	text: Option<String>,
	children: Vec<usize>,
	parent: Option<usize>,
}

/// Arena-backed node tree for headless rendering.
///
/// Nodes are never freed while the backend lives; detached nodes simply
/// become unreachable from any root, which keeps handles trivially valid.
#[derive(Debug, Default)]
pub struct TreeBackend {
	nodes: Vec<TreeNode>,
}

impl TreeBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn tag(&self, handle: TreeHandle) -> &str {
		&self.nodes[handle.0].tag
	}

	pub fn attr(&self, handle: TreeHandle, name: &str) -> Option<&Value> {
		self.nodes[handle.0].attrs.get(name)
	}

	pub fn text(&self, handle: TreeHandle) -> Option<&str> {
		self.nodes[handle.0].text.as_deref()
	}

	pub fn children(&self, handle: TreeHandle) -> Vec<TreeHandle> {
		self.nodes[handle.0].children.iter().map(|idx| TreeHandle(*idx)).collect()
	}

	pub fn parent(&self, handle: TreeHandle) -> Option<TreeHandle> {
		self.nodes[handle.0].parent.map(TreeHandle)
	}

	/// Serializes the subtree rooted at `handle` as markup, text before
	/// children. Attribute order follows attribute-name order.
	pub fn render_to_string(&self, handle: TreeHandle) -> String {
		let mut out = String::new();
		self.write_node(handle.0, &mut out);
		out
	}

	fn write_node(&self, index: usize, out: &mut String) {
		let node = &self.nodes[index];
		out.push('<');
		out.push_str(&node.tag);
		for (name, value) in &node.attrs {
			out.push(' ');
			out.push_str(name);
			out.push_str("=\"");
			out.push_str(&escape(&attr_text(value)));
			out.push('"');
		}
		out.push('>');
		if let Some(text) = &node.text {
			out.push_str(&escape(text));
		}
		for child in &node.children {
			self.write_node(*child, out);
		}
		out.push_str("</");
		out.push_str(&node.tag);
		out.push('>');
	}

	fn unlink(&mut self, index: usize) {
		if let Some(parent) = self.nodes[index].parent.take() {
			self.nodes[parent].children.retain(|child| *child != index);
		}
	}
}

fn attr_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			other => out.push(other),
		}
	}
	out
}

impl RenderBackend for TreeBackend {
	type Handle = TreeHandle;

	fn create_node(&mut self, tag: &str) -> TreeHandle {
		let index = self.nodes.len();
		self.nodes.push(TreeNode {
			tag: tag.to_string(),
			attrs: BTreeMap::new(),
			text: None,
			children: Vec::new(),
			parent: None,
		});
		TreeHandle(index)
	}

	fn set_attribute(&mut self, node: &TreeHandle, name: &str, value: &Value) {
		self.nodes[node.0].attrs.insert(name.to_string(), value.clone());
	}

	fn remove_attribute(&mut self, node: &TreeHandle, name: &str) {
		self.nodes[node.0].attrs.remove(name);
	}

	fn set_text(&mut self, node: &TreeHandle, text: Option<&str>) {
		self.nodes[node.0].text = text.map(str::to_string);
	}

	fn append_child(&mut self, parent: &TreeHandle, child: &TreeHandle) {
		self.unlink(child.0);
		self.nodes[parent.0].children.push(child.0);
		self.nodes[child.0].parent = Some(parent.0);
	}

	fn insert_child(&mut self, parent: &TreeHandle, child: &TreeHandle, index: usize) {
		self.unlink(child.0);
		let children = &mut self.nodes[parent.0].children;
		let index = index.min(children.len());
		children.insert(index, child.0);
		self.nodes[child.0].parent = Some(parent.0);
	}

	fn remove_child(&mut self, parent: &TreeHandle, child: &TreeHandle) {
		if self.nodes[child.0].parent == Some(parent.0) {
			self.unlink(child.0);
		}
	}

	fn detach(&mut self, node: &TreeHandle) {
		self.unlink(node.0);
	}
}
