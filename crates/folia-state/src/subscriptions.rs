//! Hierarchical path-to-callback subscription graph.
//!
//! A write to `a.b.c` notifies subscribers of `a.b.c` itself, of every
//! ancestor (`a.b`, `a`), and of every descendant (`a.b.c.d`, ...), since an
//! ancestor subscriber observes part of its subtree changing and a
//! descendant subscriber may have had its value replaced wholesale. Each
//! callback fires at most once per notification even when matched by more
//! than one rule.
//!
//! Removal is callback-centric: a subscription id owns the list of paths it
//! is registered under, so `unregister_all` is O(paths owned), not O(total
//! subscriptions).

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use crate::path;

/// Identifier for one registered callback.
///
/// Ids are allocated per graph and never reused within a graph's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(usize);

/// Payload delivered to subscribers when a path commits a new value.
#[derive(Debug, Clone)]
pub struct Notification {
	/// The path that was written.
	pub path: String,
	/// The committed value.
	pub new_value: Value,
	/// The value previously at the path (`Null` when absent).
	pub old_value: Value,
}

/// Callback invoked on notification.
pub type SubscriberFn = Rc<dyn Fn(&Notification)>;

/// Maps paths to interested callbacks with hierarchical matching.
#[derive(Default)]
pub struct SubscriptionGraph {
	next_id: Cell<usize>,
	callbacks: RefCell<HashMap<SubscriptionId, SubscriberFn>>,
	by_path: RefCell<HashMap<String, Vec<SubscriptionId>>>,
	owned: RefCell<HashMap<SubscriptionId, Vec<String>>>,
	/// Paths currently being notified on this call stack; re-notifying one
	/// of these synchronously would recurse, so callers defer instead.
	in_progress: RefCell<HashSet<String>>,
}

impl SubscriptionGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserves a subscription id without attaching a callback yet.
	///
	/// Reactive bindings need their own id inside the callback body (to
	/// rebind dependencies after re-execution), so id allocation and
	/// callback attachment are separate steps.
	pub fn create(&self) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.owned.borrow_mut().insert(id, Vec::new());
		id
	}

	/// Attaches (or replaces) the callback for `id`.
	pub fn set_callback(&self, id: SubscriptionId, callback: SubscriberFn) {
		self.callbacks.borrow_mut().insert(id, callback);
	}

	/// Registers `id` under `path`.
	///
	/// The id list of each path is kept sorted by creation order, so a
	/// callback that is rebound later (after a re-execution) keeps its
	/// original position relative to siblings on the same path.
	pub fn register(&self, id: SubscriptionId, path: &str) {
		let mut owned = self.owned.borrow_mut();
		let Some(paths) = owned.get_mut(&id) else {
			return; // id was never created or already unregistered
		};
		if paths.iter().any(|p| p == path) {
			return;
		}
		paths.push(path.to_string());
		let mut by_path = self.by_path.borrow_mut();
		let ids = by_path.entry(path.to_string()).or_default();
		if let Err(position) = ids.binary_search(&id) {
			ids.insert(position, id);
		}
	}

	/// Replaces the full path set owned by `id`.
	///
	/// Called after every re-execution of a reactive function so stale
	/// subscriptions never persist past one re-render. Paths are registered
	/// in sorted order to keep notification order deterministic.
	pub fn rebind(&self, id: SubscriptionId, paths: &HashSet<String>) {
		self.clear_paths(id);
		if !self.owned.borrow().contains_key(&id) {
			// Torn down while its own callback was running; stay removed.
			return;
		}
		let mut sorted: Vec<&String> = paths.iter().collect();
		sorted.sort();
		for path in sorted {
			self.register(id, path);
		}
	}

	/// Removes `id` from every path it is registered under and drops its
	/// callback. Calling this twice is a no-op.
	pub fn unregister_all(&self, id: SubscriptionId) {
		self.clear_paths(id);
		self.owned.borrow_mut().remove(&id);
		self.callbacks.borrow_mut().remove(&id);
	}

	fn clear_paths(&self, id: SubscriptionId) {
		let paths = match self.owned.borrow_mut().get_mut(&id) {
			Some(paths) => std::mem::take(paths),
			None => return,
		};
		let mut by_path = self.by_path.borrow_mut();
		for path in paths {
			if let Some(ids) = by_path.get_mut(&path) {
				ids.retain(|other| *other != id);
				if ids.is_empty() {
					by_path.remove(&path);
				}
			}
		}
	}

	/// Whether `id` is still registered.
	pub fn is_registered(&self, id: SubscriptionId) -> bool {
		self.owned.borrow().contains_key(&id)
	}

	/// Marks `path` as being notified. Returns `false` when the path is
	/// already on the notification stack — the caller must defer the
	/// notification to the next scheduler flush instead of recursing.
	pub fn begin_notify(&self, path: &str) -> bool {
		self.in_progress.borrow_mut().insert(path.to_string())
	}

	/// Clears the in-progress mark set by [`begin_notify`](Self::begin_notify).
	pub fn end_notify(&self, path: &str) {
		self.in_progress.borrow_mut().remove(path);
	}

	/// Invokes every callback matched by `notification.path` exactly once.
	///
	/// The callback list is snapshotted before any callback runs, and each
	/// entry is re-checked against the live table before invocation, so a
	/// callback torn down mid-notify (by a sibling update in the same batch)
	/// is never re-invoked after removal.
	pub fn notify(&self, notification: &Notification) {
		let matched = self.collect_matches(&notification.path);
		for id in matched {
			// Re-check: an earlier callback in this pass may have removed it.
			let callback = self.callbacks.borrow().get(&id).cloned();
			if let Some(callback) = callback {
				callback(notification);
			}
		}
	}

	/// Collects matching subscription ids in deterministic order: exact
	/// matches first (creation order), then ancestors deepest-first,
	/// then descendants in path order.
	fn collect_matches(&self, path: &str) -> Vec<SubscriptionId> {
		let by_path = self.by_path.borrow();
		let mut seen = HashSet::new();
		let mut matched = Vec::new();

		let mut push_all = |ids: &[SubscriptionId], out: &mut Vec<SubscriptionId>| {
			for id in ids {
				if seen.insert(*id) {
					out.push(*id);
				}
			}
		};

		if let Some(ids) = by_path.get(path) {
			push_all(ids, &mut matched);
		}
		for ancestor in path::ancestors(path) {
			if let Some(ids) = by_path.get(ancestor) {
				push_all(ids, &mut matched);
			}
		}
		let mut descendants: Vec<&String> = by_path
			.keys()
			.filter(|candidate| path::is_strict_prefix(path, candidate))
			.collect();
		descendants.sort();
		for descendant in descendants {
			if let Some(ids) = by_path.get(descendant.as_str()) {
				push_all(ids, &mut matched);
			}
		}
		matched
	}

	/// Number of callbacks registered under `path` (diagnostics and tests).
	pub fn subscriber_count(&self, path: &str) -> usize {
		self.by_path
			.borrow()
			.get(path)
			.map(|ids| ids.len())
			.unwrap_or(0)
	}

	/// Drops every subscription. Used by store teardown.
	pub fn clear(&self) {
		self.callbacks.borrow_mut().clear();
		self.by_path.borrow_mut().clear();
		self.owned.borrow_mut().clear();
		self.in_progress.borrow_mut().clear();
	}
}

impl std::fmt::Debug for SubscriptionGraph {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubscriptionGraph")
			.field("subscriptions", &self.owned.borrow().len())
			.field("paths", &self.by_path.borrow().len())
			.finish()
	}
}
