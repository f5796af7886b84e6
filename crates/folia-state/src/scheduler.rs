//! Write batching and flush scheduling.
//!
//! Writes that happen within one synchronous tick (a single `set` call, or
//! an explicit [`PathStore::execute_batch`](crate::PathStore::execute_batch)
//! scope) accumulate here and are drained as one notification pass.
//!
//! ## Flush timing
//!
//! Flushing is synchronous: a `set` outside any batch scope flushes before
//! returning, and `execute_batch` flushes once when the outermost scope
//! ends. There is no microtask deferral — `get` immediately after `set`
//! always observes the committed value (the tree mutates at `set` time, the
//! batch only delays *notification*).
//!
//! Writes made by a subscriber callback during a flush are appended to a
//! fresh batch and drained in a follow-up pass rather than recursed into,
//! bounding stack depth. The number of cascading passes is capped by
//! [`SchedulerConfig::max_cascade_passes`]; a batch still pending past the
//! cap is dropped and reported as a cycle.

use std::cell::{Cell, RefCell};

use serde_json::Value;

/// One pending, committed-but-unnotified write.
#[derive(Debug, Clone)]
pub struct PendingWrite {
	pub path: String,
	pub new_value: Value,
	pub old_value: Value,
}

/// Tunables for the update scheduler.
///
/// Defaults favor correctness (flush promptly, shallow cascades) over
/// maximal coalescing.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
	/// Pending entries that force an early flush even inside a batch scope.
	pub max_batch_size: usize,
	/// Cascading flush passes allowed before the remaining batch is dropped
	/// and flagged as a cyclic notification.
	pub max_cascade_passes: usize,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			max_batch_size: 512,
			max_cascade_passes: 3,
		}
	}
}

/// Batches writes between flushes.
///
/// The scheduler owns the pending queue and the batching/flushing flags;
/// the store drives the actual drain (it needs the subscription graph).
#[derive(Debug, Default)]
pub struct UpdateScheduler {
	pending: RefCell<Vec<PendingWrite>>,
	batch_depth: Cell<usize>,
	flushing: Cell<bool>,
	config: SchedulerConfig,
}

impl UpdateScheduler {
	pub fn new(config: SchedulerConfig) -> Self {
		Self {
			pending: RefCell::new(Vec::new()),
			batch_depth: Cell::new(0),
			flushing: Cell::new(false),
			config,
		}
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.config
	}

	/// Adds a write to the pending batch.
	///
	/// Multiple writes to the same path collapse into the earliest entry
	/// (preserving enqueue order) with the latest value; the original
	/// `old_value` is kept so subscribers observe the full transition.
	pub fn enqueue(&self, write: PendingWrite) {
		let mut pending = self.pending.borrow_mut();
		if let Some(existing) = pending.iter_mut().find(|entry| entry.path == write.path) {
			existing.new_value = write.new_value;
		} else {
			pending.push(write);
		}
	}

	/// Takes the current batch, leaving an empty queue for re-entrant writes.
	pub fn take_batch(&self) -> Vec<PendingWrite> {
		std::mem::take(&mut *self.pending.borrow_mut())
	}

	/// Whether a flush should run right now: not inside a batch scope, not
	/// already flushing, or the batch outgrew `max_batch_size`.
	pub fn should_flush(&self) -> bool {
		if self.flushing.get() {
			return false;
		}
		if self.batch_depth.get() == 0 {
			return true;
		}
		self.pending.borrow().len() >= self.config.max_batch_size
	}

	pub fn has_pending(&self) -> bool {
		!self.pending.borrow().is_empty()
	}

	pub fn begin_batch(&self) {
		self.batch_depth.set(self.batch_depth.get() + 1);
	}

	pub fn end_batch(&self) {
		let depth = self.batch_depth.get();
		debug_assert!(depth > 0, "end_batch without begin_batch");
		self.batch_depth.set(depth.saturating_sub(1));
	}

	pub fn in_batch(&self) -> bool {
		self.batch_depth.get() > 0
	}

	pub fn is_flushing(&self) -> bool {
		self.flushing.get()
	}

	pub fn set_flushing(&self, flushing: bool) {
		self.flushing.set(flushing);
	}

	/// Discards all pending writes. Used by store teardown.
	pub fn clear(&self) {
		self.pending.borrow_mut().clear();
	}
}
