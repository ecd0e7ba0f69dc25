//! The Compiler: turns a `Call` (task name + call-site vars) into a
//! `CompiledTask` with every template expanded against a concrete `Scope`,
//! per spec.md §4.2.
//!
//! Grounded on the teacher's `tasks/execution/preparation.rs`
//! `build_ordered_execution_list`, which walks a task's declared shape
//! (there: `oneof`/`pipeline` variants; here: `deps`/`cmds`) and resolves it
//! into something the scheduler can run directly, generalized to spec.md's
//! single task shape with layered variable scoping instead of the teacher's
//! fixed struct fields.

use crate::config::types::{
	Call, Cmd, CompiledCmd, CompiledTask, ForSpec, LoopBinding, ResolvedRequirement, TaskCall,
	TaskDef, VarValue,
};
use crate::config::ExecutorOptions;
use crate::scope::Scope;
use crate::tasks::{resolve_task, LoadedTaskfile, TaskOrigin};
use crate::template;
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-compile cache of dynamic (`sh:`-evaluated) variable results, keyed by
/// `(command string, evaluation dir)`. Spec.md §9: caching must be scoped to
/// one compile, never reused across compiles.
type DynamicCache = HashMap<(String, PathBuf), String>;

/// Compile `call` against the merged taskfile tree in `loaded`.
///
/// # Errors
///
/// - `call.target` does not resolve to a task.
/// - A dynamic variable's shell command fails to execute.
/// - A `status`/`source_glob` glob pattern is invalid.
/// - The task's `dir` cannot be created when it doesn't already exist.
pub async fn compile(
	loaded: &LoadedTaskfile,
	options: &ExecutorOptions,
	call: &TaskCall,
) -> Result<CompiledTask> {
	let (def, wildcard_vars) = resolve_task(loaded, &call.target)?;
	let origin = loaded.origins.get(def.name()).ok_or_else(|| {
		eyre!(
			"task \"{}\" has no recorded origin; this is an internal bug",
			def.name()
		)
	})?;

	let mut dynamic_cache = DynamicCache::new();
	let mut scope = Scope::new();

	// Layer order is procedural (outermost first), per spec.md §4.2 step 2.
	push_env_layer(&mut scope);
	push_string_layer(&mut scope, &loaded.dotenv);
	push_resolved_layer(&mut scope, &origin.file_vars, &origin.dir, &mut dynamic_cache).await?;
	push_resolved_layer(&mut scope, &origin.include_vars, &origin.dir, &mut dynamic_cache).await?;
	push_resolved_layer(&mut scope, def.vars(), &origin.dir, &mut dynamic_cache).await?;

	let mut call_vars = call.vars.clone();
	for (k, v) in wildcard_vars {
		call_vars.insert(k, v);
	}
	push_resolved_layer(&mut scope, &call_vars, &origin.dir, &mut dynamic_cache).await?;

	let dir = resolve_task_dir(def, &scope, &origin.dir).await?;

	push_special_vars(&mut scope, options, def, origin, &dir, &loaded.version);

	// env: block, resolved last so its values can reference everything else.
	let env = resolve_env(def.env(), &scope, &dir, &mut dynamic_cache).await?;

	let sources = expand_globs(def.sources(), &scope, &dir)?;
	let generates = def
		.generates()
		.iter()
		.map(|g| dir.join(template::expand(g, &scope)))
		.collect::<Vec<_>>();

	// CHECKSUM is derived from the sources resolved above, then bound so any
	// remaining templated field (chiefly `generates:`) can reference it.
	let checksum = quick_checksum(&sources, &env);
	scope.set_top("CHECKSUM", VarValue::String(checksum));
	let generates = generates
		.into_iter()
		.map(|g| PathBuf::from(template::expand(&g.to_string_lossy(), &scope)))
		.collect::<Vec<_>>();

	let status = def
		.status()
		.iter()
		.map(|s| template::expand(s, &scope))
		.collect::<Vec<_>>();

	let preconditions = def
		.preconditions()
		.iter()
		.map(|p| {
			(
				template::expand(&p.sh, &scope),
				p.msg.as_deref().map(|m| template::expand(m, &scope)),
			)
		})
		.collect::<Vec<_>>();

	let requires = resolve_requirements(def, &scope);

	let cmds = expand_cmds(def.cmds(), &scope, &dir)?;
	let deps = expand_deps(def.deps(), &scope)?;

	let fingerprint_key = compute_fingerprint_key(def.name(), &call_vars);

	Ok(CompiledTask {
		name: def.name().to_owned(),
		fingerprint_key,
		dir,
		cmds,
		deps,
		env,
		sources,
		generates,
		status,
		preconditions,
		requires,
		run: def.run_policy(),
		method: def.method(),
		ignore_error: def.ignore_error(),
		output: def.output().unwrap_or(loaded.default_output),
		silent: def.is_silent() || loaded.default_silent || call.silent,
		shell: def.shell().cloned().unwrap_or_default(),
	})
}

fn push_env_layer(scope: &mut Scope) {
	let mut vars = IndexMap::new();
	for (k, v) in std::env::vars() {
		vars.insert(k, VarValue::String(v));
	}
	scope.push_layer(vars);
}

fn push_string_layer(scope: &mut Scope, entries: &IndexMap<String, String>) {
	let mut vars = IndexMap::new();
	for (k, v) in entries {
		vars.insert(k.clone(), VarValue::String(v.clone()));
	}
	scope.push_layer(vars);
}

/// Resolve a raw `vars:`-shaped map (evaluating `Dynamic` entries, expanding
/// templates in string entries against the scope so far) and push it as a
/// new layer.
async fn push_resolved_layer(
	scope: &mut Scope,
	raw: &IndexMap<String, VarValue>,
	dir: &Path,
	dynamic_cache: &mut DynamicCache,
) -> Result<()> {
	let resolved = resolve_var_map(raw, scope, dir, dynamic_cache).await?;
	scope.push_layer(resolved);
	Ok(())
}

async fn resolve_var_map(
	raw: &IndexMap<String, VarValue>,
	scope: &Scope,
	dir: &Path,
	dynamic_cache: &mut DynamicCache,
) -> Result<IndexMap<String, VarValue>> {
	let mut out = IndexMap::new();
	for (k, v) in raw {
		let resolved = resolve_var_value(v, scope, dir, dynamic_cache).await?;
		out.insert(k.clone(), resolved);
	}
	Ok(out)
}

async fn resolve_var_value(
	value: &VarValue,
	scope: &Scope,
	dir: &Path,
	dynamic_cache: &mut DynamicCache,
) -> Result<VarValue> {
	match value {
		VarValue::Dynamic { sh } => {
			let key = (sh.clone(), dir.to_path_buf());
			if let Some(cached) = dynamic_cache.get(&key) {
				return Ok(VarValue::String(cached.clone()));
			}
			let output = run_dynamic(sh, dir)?;
			dynamic_cache.insert(key, output.clone());
			Ok(VarValue::String(output))
		}
		VarValue::String(s) => Ok(VarValue::String(template::expand(s, scope))),
		VarValue::Sequence(items) => {
			let mut out = Vec::with_capacity(items.len());
			for item in items {
				out.push(Box::pin(resolve_var_value(item, scope, dir, dynamic_cache)).await?);
			}
			Ok(VarValue::Sequence(out))
		}
		VarValue::Mapping(map) => {
			let mut out = IndexMap::new();
			for (k, v) in map {
				out.insert(
					k.clone(),
					Box::pin(resolve_var_value(v, scope, dir, dynamic_cache)).await?,
				);
			}
			Ok(VarValue::Mapping(out))
		}
		other => Ok(other.clone()),
	}
}

fn run_dynamic(sh: &str, dir: &Path) -> Result<String> {
	let output = Command::new("sh")
		.arg("-c")
		.arg(sh)
		.current_dir(dir)
		.output()
		.wrap_err_with(|| format!("failed to evaluate dynamic var `sh: {}`", sh))?;

	let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
	if text.ends_with('\n') {
		text.pop();
		if text.ends_with('\r') {
			text.pop();
		}
	}
	Ok(text)
}

async fn resolve_task_dir(def: &TaskDef, scope: &Scope, base_dir: &Path) -> Result<PathBuf> {
	let Some(raw_dir) = def.dir() else {
		return Ok(base_dir.to_path_buf());
	};

	let expanded = template::expand(raw_dir, scope);
	let resolved = base_dir.join(&expanded);

	if !resolved.exists() {
		async_std::fs::create_dir_all(&resolved)
			.await
			.wrap_err_with(|| format!("failed to create task dir {:?}", resolved))?;
	}

	Ok(resolved)
}

fn push_special_vars(
	scope: &mut Scope,
	options: &ExecutorOptions,
	def: &TaskDef,
	origin: &TaskOrigin,
	dir: &Path,
	version: &str,
) {
	let now_epoch = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0);

	let mut vars = IndexMap::new();
	vars.insert("TASK".to_owned(), VarValue::String(def.name().to_owned()));
	vars.insert(
		"ROOT_DIR".to_owned(),
		VarValue::String(options.dir.to_string_lossy().into_owned()),
	);
	vars.insert(
		"TASKFILE".to_owned(),
		VarValue::String(origin.source_path.clone()),
	);
	vars.insert(
		"TASKFILE_DIR".to_owned(),
		VarValue::String(origin.dir.to_string_lossy().into_owned()),
	);
	vars.insert(
		"TASK_DIR".to_owned(),
		VarValue::String(dir.to_string_lossy().into_owned()),
	);
	vars.insert(
		"USER_WORKING_DIR".to_owned(),
		VarValue::String(options.user_working_dir.to_string_lossy().into_owned()),
	);
	vars.insert("TIMESTAMP".to_owned(), VarValue::String(now_epoch.to_string()));
	vars.insert("TASK_VERSION".to_owned(), VarValue::String(version.to_owned()));
	vars.insert(
		"CLI_ARGS".to_owned(),
		VarValue::String(options.cli_args.join(" ")),
	);
	// CHECKSUM is bound later, once sources have been resolved.
	scope.push_layer(vars);
}

async fn resolve_env(
	raw: &IndexMap<String, VarValue>,
	scope: &Scope,
	dir: &Path,
	dynamic_cache: &mut DynamicCache,
) -> Result<HashMap<String, String>> {
	let resolved = resolve_var_map(raw, scope, dir, dynamic_cache).await?;
	Ok(resolved
		.into_iter()
		.map(|(k, v)| (k, v.as_display_string()))
		.collect())
}

fn expand_globs(patterns: &[String], scope: &Scope, dir: &Path) -> Result<Vec<PathBuf>> {
	let mut out = Vec::new();
	for pattern in patterns {
		let expanded = template::expand(pattern, scope);
		let full_pattern = dir.join(&expanded);
		let pattern_str = full_pattern.to_string_lossy().into_owned();

		let mut matched_any = false;
		for entry in glob::glob(&pattern_str).wrap_err_with(|| format!("invalid glob pattern {}", pattern_str))? {
			matched_any = true;
			out.push(entry.wrap_err_with(|| format!("failed to read glob match for {}", pattern_str))?);
		}
		if !matched_any && !full_pattern.to_string_lossy().contains(['*', '?', '[']) {
			// A plain (non-wildcard) source path: keep it even if missing yet,
			// so callers like the checksum fingerprinter can report "stale".
			out.push(full_pattern);
		}
	}
	Ok(out)
}

fn resolve_requirements(def: &TaskDef, scope: &Scope) -> Vec<ResolvedRequirement> {
	let Some(requires) = def.requires() else {
		return Vec::new();
	};

	requires
		.vars()
		.iter()
		.map(|name| {
			let value = scope.get(name).map(VarValue::as_display_string);
			let allowed = requires.enums().get(name).cloned();
			ResolvedRequirement {
				name: name.clone(),
				value,
				allowed,
			}
		})
		.collect()
}

fn quick_checksum(sources: &[PathBuf], env: &HashMap<String, String>) -> String {
	let mut hasher = Sha256::new();
	let mut paths: Vec<&PathBuf> = sources.iter().collect();
	paths.sort();
	for path in paths {
		hasher.update(path.to_string_lossy().as_bytes());
		if let Ok(bytes) = std::fs::read(path) {
			hasher.update(&bytes);
		}
	}
	let mut vars: Vec<(&String, &String)> = env.iter().collect();
	vars.sort_by(|a, b| a.0.cmp(b.0));
	for (k, v) in vars {
		hasher.update(k.as_bytes());
		hasher.update(v.as_bytes());
	}
	hasher
		.finalize()
		.iter()
		.map(|b| format!("{:02x}", b))
		.collect()
}

fn compute_fingerprint_key(name: &str, vars: &IndexMap<String, VarValue>) -> String {
	let mut hasher = Sha256::new();
	hasher.update(name.as_bytes());
	let mut entries: Vec<(&String, &VarValue)> = vars.iter().collect();
	entries.sort_by(|a, b| a.0.cmp(b.0));
	for (k, v) in entries {
		hasher.update(k.as_bytes());
		hasher.update(v.as_display_string().as_bytes());
	}
	format!(
		"{}-{}",
		name.replace([':', '/'], "_"),
		hasher
			.finalize()
			.iter()
			.take(8)
			.map(|b| format!("{:02x}", b))
			.collect::<String>()
	)
}

fn platform_matches(platforms: &[String]) -> bool {
	if platforms.is_empty() {
		return true;
	}
	platforms.iter().any(|p| p == std::env::consts::OS)
}

/// Expand a `for:` loop source into the list of extra variable bindings
/// each iteration should see, per spec.md §4.2 step 5.
fn resolve_for_bindings(
	for_spec: &ForSpec,
	binding: &LoopBinding,
	scope: &Scope,
	dir: &Path,
	own_sources: &[PathBuf],
) -> Result<Vec<IndexMap<String, VarValue>>> {
	let alias = binding.alias().to_owned();
	let mut bindings = Vec::new();

	match for_spec {
		ForSpec::List(items) => {
			for (idx, item) in items.iter().enumerate() {
				let mut layer = IndexMap::new();
				layer.insert(alias.clone(), item.clone());
				layer.insert("INDEX".to_owned(), VarValue::Number(idx as f64));
				bindings.push(layer);
			}
		}
		ForSpec::Split { var } => {
			let raw = scope.get(var).map(VarValue::as_display_string).unwrap_or_default();
			for (idx, item) in raw.split_whitespace().enumerate() {
				let mut layer = IndexMap::new();
				layer.insert(alias.clone(), VarValue::String(item.to_owned()));
				layer.insert("INDEX".to_owned(), VarValue::Number(idx as f64));
				bindings.push(layer);
			}
		}
		ForSpec::SourceGlob { source_glob } => {
			let expanded = template::expand(source_glob, scope);
			let pattern = dir.join(&expanded).to_string_lossy().into_owned();
			let mut idx = 0usize;
			for entry in glob::glob(&pattern).wrap_err_with(|| format!("invalid for-loop glob {}", pattern))? {
				let path = entry.wrap_err("failed to read for-loop glob match")?;
				let mut layer = IndexMap::new();
				layer.insert(alias.clone(), VarValue::String(path.to_string_lossy().into_owned()));
				layer.insert("INDEX".to_owned(), VarValue::Number(idx as f64));
				bindings.push(layer);
				idx += 1;
			}
		}
		ForSpec::OwnTaskSources(_) => {
			for (idx, path) in own_sources.iter().enumerate() {
				let mut layer = IndexMap::new();
				layer.insert(alias.clone(), VarValue::String(path.to_string_lossy().into_owned()));
				layer.insert("INDEX".to_owned(), VarValue::Number(idx as f64));
				bindings.push(layer);
			}
		}
		ForSpec::Matrix { matrix } => {
			let mut combos: Vec<IndexMap<String, VarValue>> = vec![IndexMap::new()];
			for (dim_name, values) in matrix {
				let mut next = Vec::with_capacity(combos.len() * values.len());
				for combo in &combos {
					for value in values {
						let mut extended = combo.clone();
						extended.insert(dim_name.clone(), value.clone());
						next.push(extended);
					}
				}
				combos = next;
			}
			for (idx, combo) in combos.into_iter().enumerate() {
				let mut layer = combo;
				layer.insert("INDEX".to_owned(), VarValue::Number(idx as f64));
				bindings.push(layer);
			}
		}
	}

	Ok(bindings)
}

fn expand_cmds(cmds: &[Cmd], scope: &Scope, dir: &Path) -> Result<Vec<CompiledCmd>> {
	let mut scope = scope.clone();
	let mut out = Vec::new();
	for cmd in cmds {
		expand_one_cmd(cmd, &mut scope, dir, &mut out)?;
	}
	Ok(out)
}

fn expand_one_cmd(cmd: &Cmd, scope: &mut Scope, dir: &Path, out: &mut Vec<CompiledCmd>) -> Result<()> {
	if !platform_matches(cmd.platforms()) {
		return Ok(());
	}

	let Some(for_spec) = cmd.for_spec() else {
		out.push(expand_cmd_body(cmd, scope)?);
		return Ok(());
	};

	let binding = LoopBinding::default();
	let own_sources: Vec<PathBuf> = Vec::new();
	let bindings = resolve_for_bindings(for_spec, &binding, scope, dir, &own_sources)?;

	for layer in bindings {
		scope.push_layer(layer);
		out.push(expand_cmd_body(cmd, scope)?);
		scope.pop_layer();
	}

	Ok(())
}

fn expand_cmd_body(cmd: &Cmd, scope: &Scope) -> Result<CompiledCmd> {
	match cmd {
		Cmd::Simple(s) => Ok(CompiledCmd::Shell {
			cmd: template::expand(s, scope),
			silent: false,
			ignore_error: false,
		}),
		Cmd::Shell(shell) => Ok(CompiledCmd::Shell {
			cmd: template::expand(&shell.cmd, scope),
			silent: shell.silent,
			ignore_error: shell.ignore_error,
		}),
		Cmd::Call(call_cmd) => Ok(CompiledCmd::Call {
			call: expand_call(&call_cmd.call, scope)?,
			silent: call_cmd.silent,
			ignore_error: call_cmd.ignore_error,
		}),
		Cmd::Defer(defer) => {
			let inner = expand_cmd_body(&defer.defer, scope)?;
			Ok(CompiledCmd::Defer(Box::new(inner)))
		}
	}
}

fn expand_call(call: &Call, scope: &Scope) -> Result<TaskCall> {
	let mut vars = IndexMap::new();
	for (k, v) in &call.vars {
		vars.insert(k.clone(), expand_var_value_sync(v, scope));
	}
	Ok(TaskCall {
		target: template::expand(&call.task, scope),
		vars,
		indirect: true,
		silent: call.silent,
	})
}

/// A synchronous variant of `resolve_var_value` for use inside cmd/dep
/// expansion, where dynamic values have already been resolved upstream (a
/// `Call`'s bound vars never carry `Dynamic` entries past the scope-build
/// stage, since they're lowered to `String` the moment they're pushed as a
/// layer; this only needs to expand string/sequence/mapping templates).
fn expand_var_value_sync(value: &VarValue, scope: &Scope) -> VarValue {
	match value {
		VarValue::String(s) => VarValue::String(template::expand(s, scope)),
		VarValue::Sequence(items) => {
			VarValue::Sequence(items.iter().map(|i| expand_var_value_sync(i, scope)).collect())
		}
		VarValue::Mapping(map) => VarValue::Mapping(
			map.iter()
				.map(|(k, v)| (k.clone(), expand_var_value_sync(v, scope)))
				.collect(),
		),
		other => other.clone(),
	}
}

fn expand_deps(deps: &[Call], scope: &Scope) -> Result<Vec<TaskCall>> {
	deps.iter().map(|dep| expand_call(dep, scope)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::RawTaskfile;
	use crate::fetch::{FetcherRepository, Location, RemotePolicy};
	use crate::tasks::load;

	async fn load_fixture(dir: &Path, yaml: &str) -> LoadedTaskfile {
		std::fs::write(dir.join("Taskfile.yml"), yaml).unwrap();
		let fetcher = FetcherRepository::new(dir.to_path_buf(), dir.join("cache"), RemotePolicy::default());
		load(&fetcher, Location::Path("Taskfile.yml".to_owned()), dir.to_path_buf())
			.await
			.expect("should load")
	}

	#[async_std::test]
	async fn compiles_simple_shell_cmd() {
		let dir = tempfile::tempdir().expect("tempdir");
		let loaded = load_fixture(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    cmds:\n      - echo hi\n",
		)
		.await;

		let options = ExecutorOptions::new(dir.path().to_path_buf());
		let call = TaskCall {
			target: "default".to_owned(),
			vars: IndexMap::new(),
			indirect: false,
			silent: false,
		};

		let compiled = compile(&loaded, &options, &call).await.expect("should compile");
		assert_eq!(compiled.cmds.len(), 1);
		match &compiled.cmds[0] {
			CompiledCmd::Shell { cmd, .. } => assert_eq!(cmd, "echo hi"),
			_ => panic!("expected a shell cmd"),
		}
	}

	#[async_std::test]
	async fn expands_variable_templates_in_cmds() {
		let dir = tempfile::tempdir().expect("tempdir");
		let loaded = load_fixture(
			dir.path(),
			"version: '3'\ntasks:\n  greet:\n    vars:\n      NAME: world\n    cmds:\n      - echo {{ .NAME }}\n",
		)
		.await;

		let options = ExecutorOptions::new(dir.path().to_path_buf());
		let call = TaskCall {
			target: "greet".to_owned(),
			vars: IndexMap::new(),
			indirect: false,
			silent: false,
		};

		let compiled = compile(&loaded, &options, &call).await.expect("should compile");
		match &compiled.cmds[0] {
			CompiledCmd::Shell { cmd, .. } => assert_eq!(cmd, "echo world"),
			_ => panic!("expected a shell cmd"),
		}
	}

	#[async_std::test]
	async fn call_site_vars_shadow_task_local_vars() {
		let dir = tempfile::tempdir().expect("tempdir");
		let loaded = load_fixture(
			dir.path(),
			"version: '3'\ntasks:\n  greet:\n    vars:\n      NAME: default\n    cmds:\n      - echo {{ .NAME }}\n",
		)
		.await;

		let options = ExecutorOptions::new(dir.path().to_path_buf());
		let mut vars = IndexMap::new();
		vars.insert("NAME".to_owned(), VarValue::String("override".to_owned()));
		let call = TaskCall {
			target: "greet".to_owned(),
			vars,
			indirect: false,
			silent: false,
		};

		let compiled = compile(&loaded, &options, &call).await.expect("should compile");
		match &compiled.cmds[0] {
			CompiledCmd::Shell { cmd, .. } => assert_eq!(cmd, "echo override"),
			_ => panic!("expected a shell cmd"),
		}
	}

	#[async_std::test]
	async fn for_list_expands_into_one_cmd_per_item() {
		let dir = tempfile::tempdir().expect("tempdir");
		let loaded = load_fixture(
			dir.path(),
			"version: '3'\ntasks:\n  each:\n    cmds:\n      - cmd: echo {{ .ITEM }}\n        for: [a, b, c]\n",
		)
		.await;

		let options = ExecutorOptions::new(dir.path().to_path_buf());
		let call = TaskCall {
			target: "each".to_owned(),
			vars: IndexMap::new(),
			indirect: false,
			silent: false,
		};

		let compiled = compile(&loaded, &options, &call).await.expect("should compile");
		assert_eq!(compiled.cmds.len(), 3);
		let rendered: Vec<String> = compiled
			.cmds
			.iter()
			.map(|c| match c {
				CompiledCmd::Shell { cmd, .. } => cmd.clone(),
				_ => panic!("expected shell cmds"),
			})
			.collect();
		assert_eq!(rendered, vec!["echo a", "echo b", "echo c"]);
	}

	#[async_std::test]
	async fn fingerprint_key_changes_with_bound_vars() {
		let dir = tempfile::tempdir().expect("tempdir");
		let loaded = load_fixture(
			dir.path(),
			"version: '3'\ntasks:\n  t:\n    cmds:\n      - echo hi\n",
		)
		.await;
		let options = ExecutorOptions::new(dir.path().to_path_buf());

		let call_a = TaskCall {
			target: "t".to_owned(),
			vars: IndexMap::new(),
			indirect: false,
			silent: false,
		};
		let mut vars_b = IndexMap::new();
		vars_b.insert("X".to_owned(), VarValue::String("1".to_owned()));
		let call_b = TaskCall {
			target: "t".to_owned(),
			vars: vars_b,
			indirect: false,
			silent: false,
		};

		let compiled_a = compile(&loaded, &options, &call_a).await.unwrap();
		let compiled_b = compile(&loaded, &options, &call_b).await.unwrap();
		assert_ne!(compiled_a.fingerprint_key, compiled_b.fingerprint_key);
	}

	// Silence an unused-import warning on platforms where `RawTaskfile` isn't
	// otherwise referenced by these tests.
	#[allow(dead_code)]
	fn _use(_: RawTaskfile) {}
}
