//! Dot-delimited path resolution over the state tree.
//!
//! Paths are strings of `.`-separated segments (`"user.profile.name"`).
//! A segment that traverses an array-typed value is interpreted as an index
//! (`"items.2.label"`). Lookup is a pure function over a `serde_json::Value`
//! tree so it can be unit-tested and swapped out without touching the
//! tracking or subscription layers.

use serde_json::Value;

/// Splits a path into its segments.
///
/// An empty path yields no segments; callers treat it as unaddressable.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('.').filter(|s| !s.is_empty())
}

/// Returns `true` if `ancestor` is a strict segment-wise prefix of
/// `descendant` (`"a.b"` is a prefix of `"a.b.c"` but not of `"a.bb"`).
pub fn is_strict_prefix(ancestor: &str, descendant: &str) -> bool {
	descendant.len() > ancestor.len()
		&& descendant.starts_with(ancestor)
		&& descendant.as_bytes()[ancestor.len()] == b'.'
}

/// Yields every strict ancestor of `path`, deepest first
/// (`"a.b.c"` -> `"a.b"`, `"a"`).
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
	let mut rest = path;
	std::iter::from_fn(move || {
		let cut = rest.rfind('.')?;
		rest = &rest[..cut];
		Some(rest)
	})
}

/// Resolves `path` against `tree`, returning `None` when any segment is
/// missing or traverses a non-container value.
///
/// Reading through a primitive never panics: `resolve(&json!({"a": 1}),
/// "a.b")` is simply `None`.
pub fn resolve<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
	let mut current = tree;
	for segment in segments(path) {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => {
				let index: usize = segment.parse().ok()?;
				items.get(index)?
			}
			_ => return None,
		};
	}
	if path.is_empty() { None } else { Some(current) }
}

/// Writes `value` at `path`, creating missing intermediate objects.
///
/// Numeric segments through arrays address indices; writing at an index
/// equal to the array length appends, and larger indices pad with `null`.
/// A non-container intermediate value is replaced by an object so the write
/// always lands. Returns the previous value at `path`, if any.
pub fn write(tree: &mut Value, path: &str, value: Value) -> Option<Value> {
	let parts: Vec<&str> = segments(path).collect();
	let (last, intermediate) = parts.split_last()?;

	let mut current = tree;
	for segment in intermediate {
		current = step_into(current, segment);
	}
	Some(assign(current, last, value))
}

/// Descends one segment, materializing containers as needed.
fn step_into<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
	// Decide the array case up front; holding the array borrow across the
	// object fallthrough would pin `current` for the full return lifetime.
	let array_index = if current.is_array() {
		segment.parse::<usize>().ok()
	} else {
		None
	};
	if let Some(index) = array_index {
		let Value::Array(items) = current else {
			unreachable!("checked is_array above")
		};
		if index >= items.len() {
			items.resize(index + 1, Value::Null);
		}
		return &mut items[index];
	}
	if !current.is_object() {
		*current = Value::Object(serde_json::Map::new());
	}
	match current {
		Value::Object(map) => map
			.entry(segment.to_string())
			.or_insert(Value::Null),
		_ => unreachable!("current was just coerced to an object"),
	}
}

/// Assigns into the final container, returning the displaced value.
fn assign(container: &mut Value, segment: &str, value: Value) -> Value {
	if let Value::Array(items) = container {
		if let Ok(index) = segment.parse::<usize>() {
			if index >= items.len() {
				items.resize(index + 1, Value::Null);
			}
			return std::mem::replace(&mut items[index], value);
		}
	}
	if !container.is_object() {
		*container = Value::Object(serde_json::Map::new());
	}
	match container {
		Value::Object(map) => map
			.insert(segment.to_string(), value)
			.unwrap_or(Value::Null),
		_ => unreachable!("container was just coerced to an object"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn resolve_nested_object() {
		let tree = json!({"user": {"profile": {"name": "ada"}}});
		assert_eq!(resolve(&tree, "user.profile.name"), Some(&json!("ada")));
	}

	#[rstest]
	fn resolve_array_index() {
		let tree = json!({"items": [{"id": 1}, {"id": 2}]});
		assert_eq!(resolve(&tree, "items.1.id"), Some(&json!(2)));
	}

	#[rstest]
	#[case("user.profile.missing")]
	#[case("missing")]
	#[case("items.9.id")]
	fn resolve_missing_returns_none(#[case] path: &str) {
		let tree = json!({"user": {"profile": {}}, "items": []});
		assert_eq!(resolve(&tree, path), None);
	}

	#[rstest]
	fn resolve_through_primitive_returns_none() {
		let tree = json!({"a": {"b": 42}});
		assert_eq!(resolve(&tree, "a.b.c"), None);
	}

	#[rstest]
	fn resolve_empty_path_returns_none() {
		let tree = json!({"a": 1});
		assert_eq!(resolve(&tree, ""), None);
	}

	#[rstest]
	fn write_creates_intermediates() {
		let mut tree = json!({});
		write(&mut tree, "user.profile.name", json!("ada"));
		assert_eq!(tree, json!({"user": {"profile": {"name": "ada"}}}));
	}

	#[rstest]
	fn write_returns_old_value() {
		let mut tree = json!({"counter": 1});
		let old = write(&mut tree, "counter", json!(2));
		assert_eq!(old, Some(json!(1)));
		assert_eq!(tree, json!({"counter": 2}));
	}

	#[rstest]
	fn write_array_index_appends() {
		let mut tree = json!({"items": ["a"]});
		write(&mut tree, "items.1", json!("b"));
		assert_eq!(tree, json!({"items": ["a", "b"]}));
	}

	#[rstest]
	fn write_array_index_pads_with_null() {
		let mut tree = json!({"items": []});
		write(&mut tree, "items.2", json!("c"));
		assert_eq!(tree, json!({"items": [null, null, "c"]}));
	}

	#[rstest]
	fn write_through_array_intermediate() {
		let mut tree = json!({"items": [{"id": 1}]});
		write(&mut tree, "items.0.name", json!("ada"));
		assert_eq!(tree, json!({"items": [{"id": 1, "name": "ada"}]}));
	}

	#[rstest]
	fn write_non_numeric_segment_replaces_array_with_object() {
		let mut tree = json!({"items": ["a", "b"]});
		write(&mut tree, "items.label.text", json!("x"));
		assert_eq!(tree, json!({"items": {"label": {"text": "x"}}}));
	}

	#[rstest]
	fn write_replaces_primitive_intermediate() {
		let mut tree = json!({"a": 1});
		write(&mut tree, "a.b", json!(2));
		assert_eq!(tree, json!({"a": {"b": 2}}));
	}

	#[rstest]
	#[case("a.b", "a.b.c", true)]
	#[case("a", "a.b.c", true)]
	#[case("a.b", "a.bb", false)]
	#[case("a.b.c", "a.b", false)]
	#[case("a.b", "a.b", false)]
	fn strict_prefix_is_segment_aware(
		#[case] ancestor: &str,
		#[case] descendant: &str,
		#[case] expected: bool,
	) {
		assert_eq!(is_strict_prefix(ancestor, descendant), expected);
	}

	#[rstest]
	fn ancestors_deepest_first() {
		let collected: Vec<&str> = ancestors("a.b.c").collect();
		assert_eq!(collected, vec!["a.b", "a"]);
	}
}
