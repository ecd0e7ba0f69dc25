//! Typed error kinds for the executor, matched on by the scheduler to decide
//! whether a failure is recoverable. User-facing text is attached at the CLI
//! boundary via `color_eyre`'s `.suggestion()`/`.note()`.

use thiserror::Error;

/// Every distinguishable failure kind the executor can produce.
#[derive(Error, Debug)]
pub enum RunnerError {
	#[error("taskfile not found or failed to parse: {path}")]
	TaskfileNotFound { path: String },

	#[error("taskfile {path} declares schema version {found}, which is unsupported (need >= {minimum})")]
	UnsupportedSchemaVersion {
		path: String,
		found: String,
		minimum: u32,
	},

	#[error("include cycle detected: {}", .members.join(" -> "))]
	IncludeCycle { members: Vec<String> },

	#[error("task \"{name}\" does not exist")]
	TaskNotFound { name: String },

	#[error("multiple tasks matched \"{pattern}\": {}", .candidates.join(", "))]
	AmbiguousTask {
		pattern: String,
		candidates: Vec<String>,
	},

	#[error("missing required variable(s): {}", .names.join(", "))]
	MissingRequiredVars { names: Vec<String> },

	#[error("variable {name} must be one of [{}], got \"{value}\"", .allowed.join(", "))]
	InvalidEnumValue {
		name: String,
		value: String,
		allowed: Vec<String>,
	},

	#[error("precondition failed for task \"{task}\": {message}")]
	PreconditionFailed { task: String, message: String },

	#[error("command exited with status {code} in task \"{task}\"")]
	CommandFailed { task: String, code: i32 },

	#[error("task \"{name}\" was called too many times ({count}); likely a cyclic call")]
	CalledTooManyTimes { name: String, count: u32 },

	#[error("task cancelled")]
	PromptDenied,

	#[error("refusing to fetch {url} over an insecure transport without --insecure")]
	InsecureTransport { url: String },

	#[error("include {path} is offline and not present in the remote cache")]
	OfflineCacheMiss { path: String },

	#[error("dotenv is only permitted in the root taskfile; found in included file {path}")]
	DotenvInIncludedFile { path: String },

	#[error("execution was cancelled")]
	Cancelled,

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Yaml(#[from] serde_yaml::Error),
}

impl RunnerError {
	/// Whether the scheduler should treat this as recoverable for the task
	/// that raised it (only `ignore_error` on a command failure).
	#[must_use]
	pub fn is_recoverable_with_ignore_error(&self) -> bool {
		matches!(self, RunnerError::CommandFailed { .. })
	}
}
