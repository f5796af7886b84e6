//! Node descriptions consumed by the renderer.
//!
//! ## Overview
//!
//! A [`VNode`] describes one object node: a tag, an optional identity key,
//! properties, optional text content, and optional children. Each property,
//! the text, and the children can be either static values or reactive
//! functions of a [`Context`]. Reactive parts are re-evaluated whenever a
//! state path they read changes; static parts are applied once.
//!
//! ## Example
//!
//! ```ignore
//! let node = VNode::new("div")
//! 	.attr("class", "counter")
//! 	.child(
//! 		VNode::new("span")
//! 			.text_fn(|ctx| ctx.get_state("count", json!(0))),
//! 	);
//! ```

use std::rc::Rc;

use folia_state::Context;
use serde_json::Value;

use crate::error::PropError;

/// Reactive value producer for a property or text binding.
pub type ReactiveFn = Rc<dyn Fn(&Context) -> Result<Value, PropError>>;

/// Reactive producer for a node's children.
pub type ChildrenFn = Rc<dyn Fn(&Context) -> Result<ChildrenValue, PropError>>;

/// A property or text slot: fixed value or reactive function.
#[derive(Clone)]
pub enum Prop {
	Static(Value),
	Reactive(ReactiveFn),
}

impl Prop {
	/// Wraps an infallible reactive function.
	pub fn reactive(f: impl Fn(&Context) -> Value + 'static) -> Self {
		Self::Reactive(Rc::new(move |ctx| Ok(f(ctx))))
	}

	/// Wraps a fallible reactive function.
	pub fn try_reactive(f: impl Fn(&Context) -> Result<Value, PropError> + 'static) -> Self {
		Self::Reactive(Rc::new(f))
	}

	pub fn is_reactive(&self) -> bool {
		matches!(self, Self::Reactive(_))
	}
}

impl std::fmt::Debug for Prop {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
			Self::Reactive(_) => f.write_str("Reactive(..)"),
		}
	}
}

/// What a children function produced this cycle.
#[derive(Clone, Debug)]
pub enum ChildrenValue {
	/// A full child list to mount (or reconcile against the previous list).
	Nodes(Vec<VNode>),
	/// Text content; replaces any structural children.
	Text(Value),
	/// Leave the current subtree untouched this cycle.
	Ignore,
}

/// A node's children: fixed list or reactive function.
#[derive(Clone)]
pub enum ChildrenSpec {
	Static(Vec<VNode>),
	Reactive(ChildrenFn),
}

impl std::fmt::Debug for ChildrenSpec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Static(children) => f.debug_tuple("Static").field(&children.len()).finish(),
			Self::Reactive(_) => f.write_str("Reactive(..)"),
		}
	}
}

/// Declarative description of one object node.
///
/// Properties keep their declaration order; the renderer applies and
/// re-applies them in that order.
#[derive(Clone, Debug)]
pub struct VNode {
	pub tag: String,
	pub key: Option<String>,
	pub props: Vec<(String, Prop)>,
	pub text: Option<Prop>,
	pub children: Option<ChildrenSpec>,
}

impl VNode {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			key: None,
			props: Vec::new(),
			text: None,
			children: None,
		}
	}

	/// Sets the identity key used by keyed reconciliation.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Adds a static property.
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.props.push((name.into(), Prop::Static(value.into())));
		self
	}

	/// Adds a reactive property.
	pub fn attr_fn(mut self, name: impl Into<String>, f: impl Fn(&Context) -> Value + 'static) -> Self {
		self.props.push((name.into(), Prop::reactive(f)));
		self
	}

	/// Sets static text content.
	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(Prop::Static(Value::String(text.into())));
		self
	}

	/// Sets reactive text content.
	pub fn text_fn(mut self, f: impl Fn(&Context) -> Value + 'static) -> Self {
		self.text = Some(Prop::reactive(f));
		self
	}

	/// Appends a static child. Replaces a previously set children function.
	pub fn child(mut self, child: VNode) -> Self {
		match &mut self.children {
			Some(ChildrenSpec::Static(children)) => children.push(child),
			_ => self.children = Some(ChildrenSpec::Static(vec![child])),
		}
		self
	}

	/// Sets the full static child list.
	pub fn children(mut self, children: Vec<VNode>) -> Self {
		self.children = Some(ChildrenSpec::Static(children));
		self
	}

	/// Sets a reactive children function.
	pub fn children_fn(mut self, f: impl Fn(&Context) -> ChildrenValue + 'static) -> Self {
		self.children = Some(ChildrenSpec::Reactive(Rc::new(move |ctx| Ok(f(ctx)))));
		self
	}

	/// Sets a fallible reactive children function.
	pub fn try_children_fn(
		mut self,
		f: impl Fn(&Context) -> Result<ChildrenValue, PropError> + 'static,
	) -> Self {
		self.children = Some(ChildrenSpec::Reactive(Rc::new(f)));
		self
	}
}

/// Renders a state value as node text.
///
/// `Null` renders as the empty string; strings render without quotes; other
/// values use their JSON form.
pub fn display_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}
