//! Dependency tracking for reactive functions.
//!
//! While a reactive function executes, every `PathStore::get` call records
//! the path it read into the innermost tracking frame. The resulting path
//! set becomes the function's subscription set for the next update cycle.
//!
//! Tracking is a stack: nested reactive evaluations push their own frame, so
//! an inner function's reads are never attributed to the outer caller. Only
//! paths read on the control-flow branch that actually executed are
//! recorded, which is what makes reactivity branch-aware — a read behind a
//! short-circuited conditional does not subscribe.

use std::cell::RefCell;
use std::collections::HashSet;

/// Stack-based recorder of state paths read during a reactive execution.
///
/// Owned by a [`PathStore`](crate::PathStore) instance; never global, so
/// independent stores track independently.
#[derive(Debug, Default)]
pub struct DependencyTracker {
	frames: RefCell<Vec<HashSet<String>>>,
}

impl DependencyTracker {
	/// Creates a tracker with no active frames.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes a fresh collection frame and makes it the active target.
	pub fn start_tracking(&self) {
		self.frames.borrow_mut().push(HashSet::new());
	}

	/// Pops the innermost frame, returning the paths it accumulated.
	///
	/// Returns an empty set when no frame is active; the previous frame (if
	/// any) resumes as the collection target.
	pub fn end_tracking(&self) -> HashSet<String> {
		self.frames.borrow_mut().pop().unwrap_or_default()
	}

	/// Records a read into the innermost frame, if one is active.
	pub fn record(&self, path: &str) {
		if let Some(frame) = self.frames.borrow_mut().last_mut() {
			frame.insert(path.to_string());
		}
	}

	/// Whether any tracking frame is currently active.
	pub fn is_active(&self) -> bool {
		!self.frames.borrow().is_empty()
	}

	/// Runs `f` inside its own tracking frame, returning its result together
	/// with the dependency set it read.
	pub fn scoped<R>(&self, f: impl FnOnce() -> R) -> (R, HashSet<String>) {
		self.start_tracking();
		let result = f();
		let paths = self.end_tracking();
		(result, paths)
	}
}
