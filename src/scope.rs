//! The layered variable environment used during compilation.
//!
//! Implemented as an explicit stack of maps with linear lookup, per the
//! guidance to avoid flattening until the final template expansion — each
//! layer is pushed in procedural order (outermost first: process
//! environment, dotenv, taskfile globals, included-file vars, task-local
//! vars, call-site vars, special vars) so special vars end up innermost and
//! can never be shadowed by user-declared variables.

use crate::config::types::VarValue;
use indexmap::IndexMap;

/// One layer of the scope stack.
#[derive(Debug, Clone, Default)]
struct Layer {
	vars: IndexMap<String, VarValue>,
}

/// An ordered stack of variable layers. Reads walk from the top (innermost,
/// highest precedence) down to the bottom (outermost); writes via
/// `set_top` only ever touch the top layer.
#[derive(Debug, Clone, Default)]
pub struct Scope {
	layers: Vec<Layer>,
}

impl Scope {
	#[must_use]
	pub fn new() -> Self {
		Self { layers: Vec::new() }
	}

	/// Push a new, innermost layer seeded with `vars`.
	pub fn push_layer(&mut self, vars: IndexMap<String, VarValue>) {
		self.layers.push(Layer { vars });
	}

	/// Pop the innermost layer. Panics if the scope is empty — callers are
	/// expected to push/pop in matching pairs.
	pub fn pop_layer(&mut self) {
		self.layers.pop().expect("pop_layer called on empty scope");
	}

	/// Look up `name`, walking from the innermost layer outward. Returns the
	/// first match.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&VarValue> {
		for layer in self.layers.iter().rev() {
			if let Some(value) = layer.vars.get(name) {
				return Some(value);
			}
		}
		None
	}

	/// Bind `name` in the current (innermost) layer only.
	pub fn set_top(&mut self, name: impl Into<String>, value: VarValue) {
		let layer = self
			.layers
			.last_mut()
			.expect("set_top called on empty scope");
		layer.vars.insert(name.into(), value);
	}

	/// Flatten the entire stack into one ordered map, outermost first so
	/// later (innermost) entries overwrite earlier ones — used only at the
	/// final template-expansion boundary and for `--dry`/debug output, never
	/// mid-compile.
	#[must_use]
	pub fn flatten(&self) -> IndexMap<String, VarValue> {
		let mut out = IndexMap::new();
		for layer in &self.layers {
			for (k, v) in &layer.vars {
				out.insert(k.clone(), v.clone());
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn s(v: &str) -> VarValue {
		VarValue::String(v.to_owned())
	}

	#[test]
	fn innermost_layer_wins() {
		let mut scope = Scope::new();
		scope.push_layer(IndexMap::from([("FOO".to_owned(), s("outer"))]));
		scope.push_layer(IndexMap::from([("FOO".to_owned(), s("inner"))]));

		assert_eq!(scope.get("FOO"), Some(&s("inner")));
	}

	#[test]
	fn outer_layer_visible_when_not_shadowed() {
		let mut scope = Scope::new();
		scope.push_layer(IndexMap::from([("FOO".to_owned(), s("outer"))]));
		scope.push_layer(IndexMap::new());

		assert_eq!(scope.get("FOO"), Some(&s("outer")));
	}

	#[test]
	fn special_vars_pushed_last_cannot_be_shadowed_by_later_set_top() {
		let mut scope = Scope::new();
		scope.push_layer(IndexMap::from([("TASK".to_owned(), s("call-site-value"))]));
		scope.push_layer(IndexMap::from([("TASK".to_owned(), s("special"))]));

		assert_eq!(scope.get("TASK"), Some(&s("special")));
	}

	#[test]
	fn set_top_only_touches_innermost_layer() {
		let mut scope = Scope::new();
		scope.push_layer(IndexMap::new());
		scope.push_layer(IndexMap::new());
		scope.set_top("X", s("1"));
		scope.pop_layer();

		assert_eq!(scope.get("X"), None);
	}
}
