//! Write middleware pipeline.
//!
//! Every `set` runs the store's ordered middleware chain before the write
//! commits. A middleware can pass the value through, transform it, or veto
//! the write entirely. A middleware that fails (returns `Err`) is logged
//! and treated as a veto, so one misbehaving middleware can neither corrupt
//! state nor crash the write path.

use serde_json::Value;
use thiserror::Error;

/// Everything a middleware can observe about a write in flight.
#[derive(Debug)]
pub struct WriteContext<'a> {
	/// The path being written.
	pub path: &'a str,
	/// The value currently at the path (`Null` when absent).
	pub old_value: &'a Value,
	/// The incoming value, as transformed by earlier middleware.
	pub new_value: &'a Value,
	/// Caller-supplied context, when the write came through
	/// [`PathStore::set_with_context`](crate::PathStore::set_with_context).
	pub context: Option<&'a Value>,
}

/// Decision returned by a middleware.
#[derive(Debug)]
pub enum WriteOutcome {
	/// Continue the chain with this (possibly transformed) value.
	Transformed(Value),
	/// Discard the write; no state change, no notification.
	Reject,
}

/// Failure raised by a middleware; treated as a rejection by the store.
#[derive(Debug, Error)]
pub enum MiddlewareError {
	#[error("middleware failed: {0}")]
	Failed(String),
}

/// A stage in the write pipeline.
pub trait Middleware {
	/// Inspects the write and decides whether (and with what value) it
	/// proceeds.
	fn apply(&self, write: &WriteContext<'_>) -> Result<WriteOutcome, MiddlewareError>;
}

impl<F> Middleware for F
where
	F: Fn(&WriteContext<'_>) -> Result<WriteOutcome, MiddlewareError>,
{
	fn apply(&self, write: &WriteContext<'_>) -> Result<WriteOutcome, MiddlewareError> {
		self(write)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn closure_middleware_transforms() {
		let middleware = |write: &WriteContext<'_>| {
			let doubled = write.new_value.as_i64().unwrap_or(0) * 2;
			Ok(WriteOutcome::Transformed(json!(doubled)))
		};
		let old = json!(0);
		let new = json!(21);
		let outcome = middleware
			.apply(&WriteContext {
				path: "counter",
				old_value: &old,
				new_value: &new,
				context: None,
			})
			.unwrap();
		match outcome {
			WriteOutcome::Transformed(value) => assert_eq!(value, json!(42)),
			WriteOutcome::Reject => panic!("expected transform"),
		}
	}
}
