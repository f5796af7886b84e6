//! Keyed child-list diff planning.
//!
//! Planning is pure: it compares the previous child descriptions with the
//! new ones and produces a [`ChildPlan`] without touching the backend or the
//! record table. The renderer validates the plan before mutating anything,
//! so a failed reconciliation leaves the subtree exactly as it was.
//!
//! Matching rules:
//! - A keyed new child reuses the old child with the same key, provided the
//!   tag also matches; a key that moved to a different tag gets a fresh node.
//! - Unkeyed children match positionally against the remaining unkeyed old
//!   children.
//! - Duplicate keys in the new list degrade the whole list to positional
//!   matching (with a warning) rather than guessing which twin owns the node.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::vdom::VNode;

/// One slot in the new child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlanEntry {
	/// Keep the node previously at `old_index`, patching it in place.
	Reuse { old_index: usize },
	/// Mount a brand-new node for this slot.
	Fresh,
}

/// Per-slot decisions for a new child list.
#[derive(Debug)]
pub(crate) struct ChildPlan {
	pub entries: Vec<PlanEntry>,
}

pub(crate) fn plan_children(old: &[VNode], new: &[VNode]) -> ChildPlan {
	if let Some(duplicate) = first_duplicate_key(new) {
		warn!(key = %duplicate, "duplicate child key; falling back to positional matching");
		return positional_plan(old, new);
	}

	let mut by_key: HashMap<&str, usize> = old
		.iter()
		.enumerate()
		.filter_map(|(index, node)| node.key.as_deref().map(|key| (key, index)))
		.collect();
	let mut unkeyed: VecDeque<usize> = old
		.iter()
		.enumerate()
		.filter(|(_, node)| node.key.is_none())
		.map(|(index, _)| index)
		.collect();

	let entries = new
		.iter()
		.map(|child| match &child.key {
			Some(key) => match by_key.remove(key.as_str()) {
				Some(old_index) if old[old_index].tag == child.tag => {
					PlanEntry::Reuse { old_index }
				}
				_ => PlanEntry::Fresh,
			},
			None => match unkeyed.pop_front() {
				Some(old_index) if old[old_index].tag == child.tag => {
					PlanEntry::Reuse { old_index }
				}
				_ => PlanEntry::Fresh,
			},
		})
		.collect();

	ChildPlan { entries }
}

fn positional_plan(old: &[VNode], new: &[VNode]) -> ChildPlan {
	let entries = new
		.iter()
		.enumerate()
		.map(|(index, child)| {
			if index < old.len() && old[index].tag == child.tag {
				PlanEntry::Reuse { old_index: index }
			} else {
				PlanEntry::Fresh
			}
		})
		.collect();
	ChildPlan { entries }
}

fn first_duplicate_key(children: &[VNode]) -> Option<&str> {
	let mut seen = HashSet::new();
	children
		.iter()
		.filter_map(|child| child.key.as_deref())
		.find(|key| !seen.insert(*key))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn keyed(tag: &str, key: &str) -> VNode {
		VNode::new(tag).key(key)
	}

	#[rstest]
	fn keyed_reorder_reuses_every_node() {
		let old = vec![keyed("li", "a"), keyed("li", "b"), keyed("li", "c")];
		let new = vec![keyed("li", "c"), keyed("li", "a"), keyed("li", "b")];

		let plan = plan_children(&old, &new);
		assert_eq!(
			plan.entries,
			vec![
				PlanEntry::Reuse { old_index: 2 },
				PlanEntry::Reuse { old_index: 0 },
				PlanEntry::Reuse { old_index: 1 },
			]
		);
	}

	#[rstest]
	fn new_key_gets_fresh_node() {
		let old = vec![keyed("li", "a")];
		let new = vec![keyed("li", "a"), keyed("li", "b")];

		let plan = plan_children(&old, &new);
		assert_eq!(
			plan.entries,
			vec![PlanEntry::Reuse { old_index: 0 }, PlanEntry::Fresh]
		);
	}

	#[rstest]
	fn same_key_different_tag_is_fresh() {
		let old = vec![keyed("li", "a")];
		let new = vec![keyed("div", "a")];

		let plan = plan_children(&old, &new);
		assert_eq!(plan.entries, vec![PlanEntry::Fresh]);
	}

	#[rstest]
	fn unkeyed_children_match_positionally() {
		let old = vec![VNode::new("li"), VNode::new("li")];
		let new = vec![VNode::new("li"), VNode::new("li"), VNode::new("li")];

		let plan = plan_children(&old, &new);
		assert_eq!(
			plan.entries,
			vec![
				PlanEntry::Reuse { old_index: 0 },
				PlanEntry::Reuse { old_index: 1 },
				PlanEntry::Fresh,
			]
		);
	}

	#[rstest]
	fn duplicate_keys_degrade_to_positional() {
		let old = vec![keyed("li", "a"), keyed("li", "b")];
		let new = vec![keyed("li", "b"), keyed("li", "b")];

		let plan = plan_children(&old, &new);
		// Positional: both slots line up with same-tag old nodes.
		assert_eq!(
			plan.entries,
			vec![
				PlanEntry::Reuse { old_index: 0 },
				PlanEntry::Reuse { old_index: 1 },
			]
		);
	}

	#[rstest]
	fn mixed_keyed_and_unkeyed() {
		let old = vec![keyed("li", "a"), VNode::new("li"), keyed("li", "b")];
		let new = vec![VNode::new("li"), keyed("li", "b"), keyed("li", "x")];

		let plan = plan_children(&old, &new);
		assert_eq!(
			plan.entries,
			vec![
				PlanEntry::Reuse { old_index: 1 },
				PlanEntry::Reuse { old_index: 2 },
				PlanEntry::Fresh,
			]
		);
	}
}
