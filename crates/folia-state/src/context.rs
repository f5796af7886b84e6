//! The boundary object handed to reactive functions.
//!
//! Every reactive property, children function, and headless component
//! receives a [`Context`]: a cheap clone-able handle exposing the four
//! operations the core guarantees (`get_state`, `set_state`, `subscribe`,
//! `execute_batch`). Collaborators may wrap it to carry services of their
//! own; the core is agnostic to anything beyond these four.

use std::rc::Rc;

use serde_json::Value;

use crate::store::{PathStore, Unsubscribe};
use crate::subscriptions::Notification;

/// State access handle passed into reactive functions.
#[derive(Debug, Clone)]
pub struct Context {
	store: Rc<PathStore>,
}

impl Context {
	pub fn new(store: Rc<PathStore>) -> Self {
		Self { store }
	}

	/// Tracked read; see [`PathStore::get`].
	pub fn get_state(&self, path: &str, default: Value) -> Value {
		self.store.get(path, default)
	}

	/// Untracked read; see [`PathStore::get_untracked`].
	pub fn get_state_untracked(&self, path: &str, default: Value) -> Value {
		self.store.get_untracked(path, default)
	}

	/// Write through the middleware pipeline; see [`PathStore::set`].
	pub fn set_state(&self, path: &str, value: Value) {
		self.store.set(path, value);
	}

	/// Standing subscription; see [`PathStore::subscribe`].
	pub fn subscribe(&self, path: &str, callback: impl Fn(&Notification) + 'static) -> Unsubscribe {
		self.store.subscribe(path, callback)
	}

	/// Grouped writes with a single flush; see [`PathStore::execute_batch`].
	pub fn execute_batch<R>(&self, f: impl FnOnce() -> R) -> R {
		self.store.execute_batch(f)
	}

	/// The underlying store.
	pub fn store(&self) -> &Rc<PathStore> {
		&self.store
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::StoreConfig;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn context_reads_and_writes_through_store() {
		let store = PathStore::create(StoreConfig::default());
		let ctx = Context::new(store.clone());

		ctx.set_state("greeting", json!("hello"));
		assert_eq!(ctx.get_state("greeting", Value::Null), json!("hello"));
		assert_eq!(store.get_untracked("greeting", Value::Null), json!("hello"));
	}

	#[rstest]
	fn context_batch_coalesces() {
		let store = PathStore::create(StoreConfig::default());
		let ctx = Context::new(store.clone());

		let seen = std::rc::Rc::new(std::cell::RefCell::new(0));
		let seen_clone = seen.clone();
		let _sub = ctx.subscribe("n", move |_| *seen_clone.borrow_mut() += 1);

		ctx.execute_batch(|| {
			ctx.set_state("n", json!(1));
			ctx.set_state("n", json!(2));
		});
		assert_eq!(*seen.borrow(), 1);
	}
}
