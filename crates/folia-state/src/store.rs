//! The path-addressed reactive state store.
//!
//! A [`PathStore`] holds all application state as one nested
//! `serde_json::Value`, addressed by dot-delimited paths. Reads participate
//! in dependency tracking; writes run the middleware pipeline, commit to the
//! tree, and hand the change to the update scheduler, which drains batches
//! through the subscription graph.
//!
//! Stores are explicit instances (`PathStore::create`), never process
//! globals, so multiple independent apps can coexist in one process.
//!
//! ## Example
//!
//! ```ignore
//! use folia_state::{PathStore, StoreConfig};
//! use serde_json::json;
//!
//! let store = PathStore::create(StoreConfig::default());
//! store.set("counter", json!(0));
//!
//! let sub = store.subscribe("counter", |n| {
//!     println!("counter: {} -> {}", n.old_value, n.new_value);
//! });
//!
//! store.set("counter", json!(1)); // subscriber fires once
//! sub.unsubscribe();
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use crate::middleware::{Middleware, WriteContext, WriteOutcome};
use crate::path;
use crate::scheduler::{PendingWrite, SchedulerConfig, UpdateScheduler};
use crate::subscriptions::{Notification, SubscriptionGraph, SubscriptionId};
use crate::tracker::DependencyTracker;

/// Whether a `set` that commits a value equal to the current one notifies
/// subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
	/// Equal writes to an existing path are dropped without notification.
	#[default]
	SkipEqual,
	/// Every accepted write notifies, equal or not.
	Always,
}

/// Store construction options.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
	pub notify_policy: NotifyPolicy,
	pub scheduler: SchedulerConfig,
}

/// Path-addressed reactive state store.
pub struct PathStore {
	state: RefCell<Value>,
	middleware: RefCell<Vec<Rc<dyn Middleware>>>,
	tracker: DependencyTracker,
	subscriptions: SubscriptionGraph,
	scheduler: UpdateScheduler,
	notify_policy: NotifyPolicy,
}

impl PathStore {
	/// Creates a store with an empty object root.
	pub fn create(config: StoreConfig) -> Rc<Self> {
		Self::with_state(Value::Object(serde_json::Map::new()), config)
	}

	/// Creates a store seeded with `initial` state.
	pub fn with_state(initial: Value, config: StoreConfig) -> Rc<Self> {
		Rc::new(Self {
			state: RefCell::new(initial),
			middleware: RefCell::new(Vec::new()),
			tracker: DependencyTracker::new(),
			subscriptions: SubscriptionGraph::new(),
			scheduler: UpdateScheduler::new(config.scheduler),
			notify_policy: config.notify_policy,
		})
	}

	/// Returns the value at `path`, or `default` when the path is absent or
	/// traverses a non-container value. Never creates the path.
	///
	/// When called inside an active tracking frame, registers `path` as a
	/// dependency of the executing reactive function.
	pub fn get(&self, path: &str, default: Value) -> Value {
		self.tracker.record(path);
		self.get_untracked(path, default)
	}

	/// [`get`](Self::get) without dependency registration.
	pub fn get_untracked(&self, path: &str, default: Value) -> Value {
		path::resolve(&self.state.borrow(), path)
			.cloned()
			.unwrap_or(default)
	}

	/// Writes `value` at `path` after running the middleware chain.
	///
	/// Rejections (middleware veto or failure) are silent no-ops from the
	/// caller's perspective; they are logged, the tree is untouched, and no
	/// notification occurs.
	pub fn set(&self, path: &str, value: Value) {
		self.commit(path, value, None);
	}

	/// [`set`](Self::set) with a caller context value visible to middleware.
	pub fn set_with_context(&self, path: &str, value: Value, context: Value) {
		self.commit(path, value, Some(context));
	}

	fn commit(&self, path: &str, value: Value, context: Option<Value>) {
		if path::segments(path).next().is_none() {
			warn!(path = %path, "write to unaddressable path discarded");
			return;
		}

		let existing = path::resolve(&self.state.borrow(), path).cloned();
		let old_value = existing.clone().unwrap_or(Value::Null);

		// Middleware chain; snapshot so a middleware adding middleware
		// cannot invalidate the iteration.
		let chain: Vec<Rc<dyn Middleware>> = self.middleware.borrow().clone();
		let mut value = value;
		for middleware in chain {
			let write = WriteContext {
				path,
				old_value: &old_value,
				new_value: &value,
				context: context.as_ref(),
			};
			match middleware.apply(&write) {
				Ok(WriteOutcome::Transformed(transformed)) => value = transformed,
				Ok(WriteOutcome::Reject) => {
					debug!(path = %path, "write rejected by middleware");
					return;
				}
				Err(error) => {
					warn!(path = %path, error = %error, "middleware failed; write discarded");
					return;
				}
			}
		}

		if self.notify_policy == NotifyPolicy::SkipEqual
			&& existing.is_some()
			&& old_value == value
		{
			return;
		}

		path::write(&mut self.state.borrow_mut(), path, value.clone());
		self.scheduler.enqueue(PendingWrite {
			path: path.to_string(),
			new_value: value,
			old_value,
		});
		if self.scheduler.should_flush() {
			self.flush();
		}
	}

	/// Runs `f`, coalescing every write it makes into a single notification
	/// pass flushed when the outermost batch scope ends.
	pub fn execute_batch<R>(&self, f: impl FnOnce() -> R) -> R {
		self.scheduler.begin_batch();
		let result = f();
		self.scheduler.end_batch();
		if !self.scheduler.in_batch()
			&& self.scheduler.has_pending()
			&& !self.scheduler.is_flushing()
		{
			self.flush();
		}
		result
	}

	/// Drains the pending batch, notifying subscribers once per distinct
	/// path. Idempotent; calling during an in-progress flush is a no-op.
	///
	/// Writes made by callbacks during the drain land in a fresh batch and
	/// are drained in follow-up passes (never recursed). When the batch is
	/// still refilling after `max_cascade_passes` passes, the remainder is
	/// dropped and reported as a cyclic notification.
	pub fn flush(&self) {
		if self.scheduler.is_flushing() {
			return;
		}
		self.scheduler.set_flushing(true);

		let mut passes = 0;
		loop {
			let batch = self.scheduler.take_batch();
			if batch.is_empty() {
				break;
			}
			passes += 1;
			if passes > self.scheduler.config().max_cascade_passes {
				warn!(
					dropped = batch.len(),
					passes, "cyclic notification detected; dropping remaining batch"
				);
				break;
			}
			for write in batch {
				if !self.subscriptions.begin_notify(&write.path) {
					// Already being notified higher on this stack; defer.
					self.scheduler.enqueue(write);
					continue;
				}
				let notification = Notification {
					path: write.path,
					new_value: write.new_value,
					old_value: write.old_value,
				};
				self.subscriptions.notify(&notification);
				self.subscriptions.end_notify(&notification.path);
			}
		}

		self.scheduler.set_flushing(false);
	}

	/// Registers a standing listener on `path` (hierarchical matching, see
	/// [`SubscriptionGraph`]). The returned handle removes it; calling
	/// [`Unsubscribe::unsubscribe`] more than once is a no-op.
	pub fn subscribe(
		self: &Rc<Self>,
		path: &str,
		callback: impl Fn(&Notification) + 'static,
	) -> Unsubscribe {
		let id = self.subscriptions.create();
		self.subscriptions.set_callback(id, Rc::new(callback));
		self.subscriptions.register(id, path);
		Unsubscribe {
			store: Rc::downgrade(self),
			id,
		}
	}

	/// Appends a middleware to the write pipeline.
	pub fn add_middleware(&self, middleware: impl Middleware + 'static) {
		self.middleware.borrow_mut().push(Rc::new(middleware));
	}

	/// Runs `f` inside a fresh dependency-tracking frame, returning its
	/// result and the set of paths it read.
	pub fn track<R>(&self, f: impl FnOnce() -> R) -> (R, HashSet<String>) {
		self.tracker.scoped(f)
	}

	/// The store's dependency tracker.
	pub fn tracker(&self) -> &DependencyTracker {
		&self.tracker
	}

	/// The store's subscription graph.
	pub fn subscriptions(&self) -> &SubscriptionGraph {
		&self.subscriptions
	}

	/// A deep copy of the current state tree.
	pub fn snapshot(&self) -> Value {
		self.state.borrow().clone()
	}

	/// Releases every subscription and pending write. The tree itself is
	/// left in place so late reads stay coherent during shutdown.
	pub fn teardown(&self) {
		self.subscriptions.clear();
		self.scheduler.clear();
	}
}

impl std::fmt::Debug for PathStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PathStore")
			.field("subscriptions", &self.subscriptions)
			.field("middleware", &self.middleware.borrow().len())
			.finish()
	}
}

/// Handle returned by [`PathStore::subscribe`]; removes the subscription.
#[derive(Debug)]
pub struct Unsubscribe {
	store: Weak<PathStore>,
	id: SubscriptionId,
}

impl Unsubscribe {
	/// Removes the subscription. Idempotent: the second and later calls
	/// find nothing to remove and do nothing.
	pub fn unsubscribe(&self) {
		if let Some(store) = self.store.upgrade() {
			store.subscriptions.unregister_all(self.id);
		}
	}
}
