//! The raw, pre-compilation shape of a taskfile as parsed from YAML, plus the
//! runtime types (`TaskCall`, `CompiledTask`) produced while executing it.
//!
//! Mirrors the teacher's `TaskConf`/`TopLevelConf` private-field +
//! `#[must_use] get_x()` accessor convention; fields stay private so every
//! read goes through a documented accessor instead of being poked at ad hoc.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum schema version this loader accepts.
pub const MINIMUM_SCHEMA_VERSION: u32 = 3;

/// A typed variable value. Plain YAML scalars/sequences/mappings map
/// straight onto the matching variant; `Dynamic` is the `sh:`-tagged form
/// that must be shell-evaluated once per compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
	String(String),
	Bool(bool),
	Number(f64),
	Sequence(Vec<VarValue>),
	Dynamic { sh: String },
	Mapping(IndexMap<String, VarValue>),
}

impl VarValue {
	/// Render this value as a string for template interpolation / env
	/// export. Sequences/mappings are not interpolatable on their own and
	/// render as a space/debug join; callers needing env vars should only
	/// ever pass string/bool/number values here.
	#[must_use]
	pub fn as_display_string(&self) -> String {
		match self {
			VarValue::String(s) => s.clone(),
			VarValue::Bool(b) => b.to_string(),
			VarValue::Number(n) => {
				if n.fract() == 0.0 {
					format!("{}", *n as i64)
				} else {
					n.to_string()
				}
			}
			VarValue::Sequence(items) => items
				.iter()
				.map(VarValue::as_display_string)
				.collect::<Vec<_>>()
				.join(" "),
			VarValue::Mapping(_) => format!("{:?}", self),
			VarValue::Dynamic { sh } => format!("$({})", sh),
		}
	}

	/// True if this is a `Dynamic` (shell-evaluated) value.
	#[must_use]
	pub fn is_dynamic(&self) -> bool {
		matches!(self, VarValue::Dynamic { .. })
	}
}

/// `requires:` block on a task — variables that must be bound, optionally
/// restricted to an enumerated set of allowed values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiresSpec {
	#[serde(default)]
	vars: Vec<String>,
	#[serde(default)]
	enums: IndexMap<String, Vec<String>>,
}

impl RequiresSpec {
	#[must_use]
	pub fn vars(&self) -> &[String] {
		&self.vars
	}

	#[must_use]
	pub fn enums(&self) -> &IndexMap<String, Vec<String>> {
		&self.enums
	}
}

/// Per-task shell overrides, defaulting from the Executor-wide shell
/// options when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellOptions {
	#[serde(default = "default_shell_executable")]
	executable: String,
	#[serde(default)]
	pipefail: bool,
}

impl Default for ShellOptions {
	fn default() -> Self {
		Self {
			executable: default_shell_executable(),
			pipefail: false,
		}
	}
}

fn default_shell_executable() -> String {
	"sh".to_owned()
}

impl ShellOptions {
	#[must_use]
	pub fn executable(&self) -> &str {
		&self.executable
	}

	#[must_use]
	pub fn pipefail(&self) -> bool {
		self.pipefail
	}
}

/// Source of a `for:` loop's iteration items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForSpec {
	/// `for: { matrix: { OS: [...], ARCH: [...] } }`
	Matrix { matrix: IndexMap<String, Vec<VarValue>> },
	/// `for: { var: SOME_VAR }` — split on whitespace at compile time.
	Split { var: String },
	/// `for: { source_glob: "*.txt" }`
	SourceGlob { source_glob: String },
	/// `for: "sources"` — iterate the task's own resolved `sources`.
	OwnTaskSources(String),
	/// `for: [a, b, c]`
	List(Vec<VarValue>),
}

/// `as` naming for the bound loop variable; defaults to `ITEM`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopBinding {
	#[serde(rename = "as", default)]
	alias: Option<String>,
}

impl LoopBinding {
	#[must_use]
	pub fn alias(&self) -> &str {
		self.alias.as_deref().unwrap_or("ITEM")
	}
}

/// A task call: target name plus bound variables, used both for `deps` and
/// for the `Cmd::Call` variant.
///
/// Deserializes from either a bare string (`- sometask`), naming the target
/// with no bound variables, or the full mapping form (`- task: sometask
/// \n   vars: {...}`); spec.md §3's `deps: [...]` entries and `task:` call
/// sites are routinely written as plain strings when no vars are needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "CallRepr")]
pub struct Call {
	pub task: String,
	pub vars: IndexMap<String, VarValue>,
	pub silent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CallRepr {
	Simple(String),
	Full {
		task: String,
		#[serde(default)]
		vars: IndexMap<String, VarValue>,
		#[serde(default)]
		silent: bool,
	},
}

impl From<CallRepr> for Call {
	fn from(repr: CallRepr) -> Self {
		match repr {
			CallRepr::Simple(task) => Call {
				task,
				vars: IndexMap::new(),
				silent: false,
			},
			CallRepr::Full { task, vars, silent } => Call { task, vars, silent },
		}
	}
}

/// A single dependency entry on a task.
pub type Dep = Call;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellCmd {
	pub cmd: String,
	#[serde(default)]
	pub silent: bool,
	#[serde(default)]
	pub ignore_error: bool,
	#[serde(default)]
	pub platforms: Vec<String>,
	#[serde(default, rename = "for")]
	pub for_spec: Option<ForSpec>,
	#[serde(default)]
	pub loop_binding: LoopBinding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallCmd {
	pub call: Call,
	#[serde(default)]
	pub silent: bool,
	#[serde(default)]
	pub ignore_error: bool,
	#[serde(default)]
	pub platforms: Vec<String>,
	#[serde(default, rename = "for")]
	pub for_spec: Option<ForSpec>,
	#[serde(default)]
	pub loop_binding: LoopBinding,
}

/// A deferred cmd wraps a boxed shell/call cmd rather than being a
/// free-standing string; it is pushed onto the task's defer stack instead of
/// executing immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferCmd {
	pub defer: Box<Cmd>,
}

/// One element of a task's `cmds` list: a tagged union, never an in-band
/// string marker (spec.md / `other_examples` disagree with the teacher here,
/// which has no such concept at all) — except for `Simple`, the bare-string
/// shell form (`cmds: [echo hi]`), which is the form spec.md §8's scenarios
/// are written in and carries no silent/ignore_error/platforms/for fields of
/// its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cmd {
	Defer(DeferCmd),
	Call(CallCmd),
	Shell(ShellCmd),
	Simple(String),
}

impl Cmd {
	#[must_use]
	pub fn is_deferred(&self) -> bool {
		matches!(self, Cmd::Defer(_))
	}

	#[must_use]
	pub fn platforms(&self) -> &[String] {
		match self {
			Cmd::Shell(s) => &s.platforms,
			Cmd::Call(c) => &c.platforms,
			Cmd::Defer(d) => d.defer.platforms(),
			Cmd::Simple(_) => &[],
		}
	}

	#[must_use]
	pub fn for_spec(&self) -> Option<&ForSpec> {
		match self {
			Cmd::Shell(s) => s.for_spec.as_ref(),
			Cmd::Call(c) => c.for_spec.as_ref(),
			Cmd::Defer(d) => d.defer.for_spec(),
			Cmd::Simple(_) => None,
		}
	}

	/// The bound name a `for` loop's item is exposed under, e.g. `ITEM`.
	#[must_use]
	pub fn loop_alias(&self) -> &str {
		match self {
			Cmd::Shell(s) => s.loop_binding.alias(),
			Cmd::Call(c) => c.loop_binding.alias(),
			Cmd::Defer(d) => d.defer.loop_alias(),
			Cmd::Simple(_) => "ITEM",
		}
	}
}

/// `run:` policy controlling dedup behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPolicy {
	Always,
	Once,
	WhenChanged,
}

impl Default for RunPolicy {
	fn default() -> Self {
		RunPolicy::Always
	}
}

/// Fingerprint method used to decide "up to date".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMethod {
	Checksum,
	Timestamp,
	None,
}

impl Default for FingerprintMethod {
	fn default() -> Self {
		FingerprintMethod::Checksum
	}
}

/// Output rendering style; `interleaved` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStyle {
	Interleaved,
	Group,
	Prefixed,
	None,
}

impl Default for OutputStyle {
	fn default() -> Self {
		OutputStyle::Interleaved
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreconditionSpec {
	pub sh: String,
	#[serde(default)]
	pub msg: Option<String>,
}

/// A task as loaded from YAML, before compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
	#[serde(skip)]
	name: String,
	#[serde(default)]
	description: Option<String>,
	#[serde(default)]
	cmds: Vec<Cmd>,
	#[serde(default)]
	deps: Vec<Dep>,
	#[serde(default)]
	vars: IndexMap<String, VarValue>,
	#[serde(default)]
	env: IndexMap<String, VarValue>,
	#[serde(default)]
	dir: Option<String>,
	#[serde(default)]
	sources: Vec<String>,
	#[serde(default)]
	generates: Vec<String>,
	#[serde(default)]
	status: Vec<String>,
	#[serde(default)]
	preconditions: Vec<PreconditionSpec>,
	#[serde(default)]
	aliases: Vec<String>,
	#[serde(default)]
	internal: bool,
	#[serde(default)]
	silent: bool,
	#[serde(default)]
	run: RunPolicy,
	#[serde(default)]
	method: FingerprintMethod,
	#[serde(default)]
	ignore_error: bool,
	#[serde(default)]
	output: Option<OutputStyle>,
	#[serde(default)]
	platforms: Vec<String>,
	#[serde(default)]
	requires: Option<RequiresSpec>,
	#[serde(default)]
	shell: Option<ShellOptions>,
}

impl TaskDef {
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn set_name(&mut self, name: String) {
		self.name = name;
	}

	#[must_use]
	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	#[must_use]
	pub fn cmds(&self) -> &[Cmd] {
		&self.cmds
	}

	#[must_use]
	pub fn deps(&self) -> &[Dep] {
		&self.deps
	}

	#[must_use]
	pub fn vars(&self) -> &IndexMap<String, VarValue> {
		&self.vars
	}

	#[must_use]
	pub fn env(&self) -> &IndexMap<String, VarValue> {
		&self.env
	}

	#[must_use]
	pub fn dir(&self) -> Option<&str> {
		self.dir.as_deref()
	}

	#[must_use]
	pub fn sources(&self) -> &[String] {
		&self.sources
	}

	#[must_use]
	pub fn generates(&self) -> &[String] {
		&self.generates
	}

	#[must_use]
	pub fn status(&self) -> &[String] {
		&self.status
	}

	#[must_use]
	pub fn preconditions(&self) -> &[PreconditionSpec] {
		&self.preconditions
	}

	#[must_use]
	pub fn aliases(&self) -> &[String] {
		&self.aliases
	}

	#[must_use]
	pub fn is_internal(&self) -> bool {
		self.internal
	}

	#[must_use]
	pub fn is_silent(&self) -> bool {
		self.silent
	}

	#[must_use]
	pub fn run_policy(&self) -> RunPolicy {
		self.run
	}

	#[must_use]
	pub fn method(&self) -> FingerprintMethod {
		self.method
	}

	#[must_use]
	pub fn ignore_error(&self) -> bool {
		self.ignore_error
	}

	#[must_use]
	pub fn output(&self) -> Option<OutputStyle> {
		self.output
	}

	#[must_use]
	pub fn platforms(&self) -> &[String] {
		&self.platforms
	}

	#[must_use]
	pub fn requires(&self) -> Option<&RequiresSpec> {
		self.requires.as_ref()
	}

	#[must_use]
	pub fn shell(&self) -> Option<&ShellOptions> {
		self.shell.as_ref()
	}
}

/// An `include:` entry on a taskfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeDef {
	pub taskfile: String,
	#[serde(default)]
	pub dir: Option<String>,
	#[serde(default)]
	pub optional: bool,
	#[serde(default)]
	pub flatten: bool,
	#[serde(default)]
	pub internal: bool,
	#[serde(default)]
	pub vars: IndexMap<String, VarValue>,
}

/// The raw top-level shape of a single parsed YAML taskfile document, before
/// merging with its includes. Mirrors the teacher's `TaskConfFile` wrapper
/// pattern for top-level documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTaskfile {
	pub version: String,
	#[serde(default)]
	pub output: Option<OutputStyle>,
	#[serde(default)]
	pub silent: bool,
	#[serde(default)]
	pub dotenv: Vec<String>,
	#[serde(default)]
	pub vars: IndexMap<String, VarValue>,
	#[serde(default)]
	pub env: IndexMap<String, VarValue>,
	#[serde(default)]
	pub includes: IndexMap<String, IncludeDef>,
	#[serde(default)]
	pub tasks: HashMap<String, TaskDef>,
}

/// A runtime invocation of a task: the target name, bound variables, and
/// whether it arrived indirectly (from a dep/cmd) or as a top-level ask.
#[derive(Debug, Clone)]
pub struct TaskCall {
	pub target: String,
	pub vars: IndexMap<String, VarValue>,
	pub indirect: bool,
	pub silent: bool,
}

/// A single `requires:` entry resolved against the compile-time scope, kept
/// around so the Scheduler can validate it without re-walking the scope.
#[derive(Debug, Clone)]
pub struct ResolvedRequirement {
	pub name: String,
	pub value: Option<String>,
	pub allowed: Option<Vec<String>>,
}

/// A task after every template has been expanded against a concrete scope.
#[derive(Debug, Clone)]
pub struct CompiledTask {
	pub name: String,
	pub fingerprint_key: String,
	pub dir: std::path::PathBuf,
	pub cmds: Vec<CompiledCmd>,
	pub deps: Vec<TaskCall>,
	pub env: HashMap<String, String>,
	pub sources: Vec<std::path::PathBuf>,
	pub generates: Vec<std::path::PathBuf>,
	pub status: Vec<String>,
	pub preconditions: Vec<(String, Option<String>)>,
	pub requires: Vec<ResolvedRequirement>,
	pub run: RunPolicy,
	pub method: FingerprintMethod,
	pub ignore_error: bool,
	pub output: OutputStyle,
	pub silent: bool,
	pub shell: ShellOptions,
}

/// A single expanded cmd ready to execute: shell string, nested call, or
/// deferred wrapper, already past `for`-loop and platform expansion.
#[derive(Debug, Clone)]
pub enum CompiledCmd {
	Shell {
		cmd: String,
		silent: bool,
		ignore_error: bool,
	},
	Call {
		call: TaskCall,
		silent: bool,
		ignore_error: bool,
	},
	Defer(Box<CompiledCmd>),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn var_value_display_string() {
		assert_eq!(VarValue::String("a".to_owned()).as_display_string(), "a");
		assert_eq!(VarValue::Bool(true).as_display_string(), "true");
		assert_eq!(VarValue::Number(3.0).as_display_string(), "3");
		assert_eq!(VarValue::Number(3.5).as_display_string(), "3.5");
	}

	#[test]
	fn cmd_shape_roundtrips_through_yaml() {
		let yaml = "cmd: echo hi\nsilent: true\n";
		let parsed: Cmd = serde_yaml::from_str(yaml).expect("should parse");
		match parsed {
			Cmd::Shell(s) => {
				assert_eq!(s.cmd, "echo hi");
				assert!(s.silent);
			}
			_ => panic!("expected a Shell cmd"),
		}
	}
}
