//! Renderer error types.

use thiserror::Error;

use crate::renderer::NodeKey;

/// Failure raised by a reactive property or children function.
///
/// The renderer catches these per binding: the owning node keeps its last
/// successfully rendered value and sibling bindings are unaffected.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PropError(pub String);

impl From<String> for PropError {
	fn from(message: String) -> Self {
		Self(message)
	}
}

impl From<&str> for PropError {
	fn from(message: &str) -> Self {
		Self(message.to_string())
	}
}

/// Errors surfaced at the reconciliation boundary.
///
/// A reconcile error triggers the fine-grained fallback for the affected
/// subtree only; it never aborts an in-progress flush for unrelated paths.
#[derive(Debug, Error)]
pub enum RenderError {
	/// The record table has no entry for a node the plan wants to reuse.
	#[error("render record missing for node {0}")]
	MissingRecord(NodeKey),
}
