//! Content equivalence between two paths
//!
//! Cheap structural shortcuts run first; only when a pair survives
//! them is the external comparator spawned. The child is polled, not
//! awaited, so the calling thread can keep a spinner alive while a
//! large recursive compare grinds.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::entry::{self, EntryKind};
use crate::error::MergeError;
use crate::progress::Spinner;

/// Outcome of an equivalence check.
///
/// Errors travel separately as `MergeError`; a verdict is always a
/// definite statement about the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	Identical,
	Differ,
	/// Exactly one side is a directory. The comparator is never asked
	/// about this case; it is not guaranteed to handle it safely.
	StructuralMismatch,
}

pub struct Checker {
	comparator: PathBuf,
	poll_interval: Duration,
	spinner: Spinner,
}

impl Checker {
	pub fn new(config: &Config) -> Self {
		Checker {
			comparator: config.comparator.clone(),
			poll_interval: Duration::from_millis(config.poll_interval_ms),
			spinner: Spinner::new(),
		}
	}

	/// Decide whether `a` and `b` are recursively identical
	pub fn verdict(&mut self, a: &Path, b: &Path) -> Result<Verdict, MergeError> {
		let a_kind = EntryKind::observe(a);
		let b_kind = EntryKind::observe(b);
		let a_dir = a_kind == EntryKind::Directory;
		let b_dir = b_kind == EntryKind::Directory;

		if a_dir != b_dir {
			return Ok(Verdict::StructuralMismatch);
		}

		// The comparator reads its operands; pipes and other special
		// files cannot be read safely. Unknown content is not identical.
		if !comparable(a_kind) || !comparable(b_kind) {
			return Ok(Verdict::Differ);
		}

		if a_dir {
			// Unequal immediate-entry counts decide without a full
			// recursive diff.
			let a_count = entry::list_entries(a, &mut self.spinner)?.len();
			let b_count = entry::list_entries(b, &mut self.spinner)?.len();
			if a_count != b_count {
				debug!("{} holds {} entries, {} holds {}", a.display(), a_count, b.display(), b_count);
				return Ok(Verdict::Differ);
			}
		} else {
			let a_len = fs::symlink_metadata(a)?.len();
			let b_len = fs::symlink_metadata(b)?.len();
			if a_len != b_len {
				return Ok(Verdict::Differ);
			}
		}

		self.run_comparator(a, b)
	}

	fn run_comparator(&mut self, a: &Path, b: &Path) -> Result<Verdict, MergeError> {
		// Captures go through temp files, not pipes: a chatty compare
		// must not be able to fill a pipe while we only poll.
		let out_file = tempfile::tempfile()?;
		let mut err_file = tempfile::tempfile()?;

		let mut child = Command::new(&self.comparator)
			.arg("-r")
			.arg("-q")
			.arg("--no-dereference")
			.arg(comparand(a))
			.arg(comparand(b))
			.stdin(Stdio::null())
			.stdout(out_file.try_clone()?)
			.stderr(err_file.try_clone()?)
			.spawn()
			.map_err(|e| MergeError::Spawn {
				command: self.comparator.display().to_string(),
				source: e,
			})?;

		// A poll that finds the child still running is not an error;
		// it is one spinner frame.
		let status = loop {
			match child.try_wait()? {
				Some(status) => break status,
				None => {
					self.spinner.tick();
					thread::sleep(self.poll_interval);
				}
			}
		};
		self.spinner.finish();

		match status.code() {
			Some(0) => Ok(Verdict::Identical),
			Some(2) => {
				let stderr = read_back(&mut err_file);
				if stderr.to_lowercase().contains("permission denied") {
					// An unreadable sub-entry masks comparison rather
					// than blocking it; unknown content is not identical.
					warn!("comparator: {}", stderr.trim());
					Ok(Verdict::Differ)
				} else {
					Err(MergeError::Comparator { message: stderr.trim().to_string() })
				}
			}
			Some(_) => Ok(Verdict::Differ),
			None => Err(MergeError::Comparator {
				message: format!("terminated by signal comparing {} and {}", a.display(), b.display()),
			}),
		}
	}

	/// Run the comparator in full (non-brief) mode and print its output.
	/// Used by the show-diff loop; blocking is fine here, the operator
	/// asked for it.
	pub fn print_diff(&self, a: &Path, b: &Path) -> Result<(), MergeError> {
		let output = Command::new(&self.comparator)
			.arg("-r")
			.arg("--no-dereference")
			.arg(comparand(a))
			.arg(comparand(b))
			.output()
			.map_err(|e| MergeError::Spawn {
				command: self.comparator.display().to_string(),
				source: e,
			})?;
		let mut stdout = std::io::stdout();
		let _ = std::io::Write::write_all(&mut stdout, &output.stdout);
		Ok(())
	}
}

fn comparable(kind: EntryKind) -> bool {
	matches!(
		kind,
		EntryKind::Regular | EntryKind::Executable | EntryKind::Directory | EntryKind::Symlink
	)
}

/// Normalized form handed to the comparator. Directories get a trailing
/// separator so the tool does not duplicate the final path segment in
/// its output.
fn comparand(path: &Path) -> OsString {
	let mut s = entry::normalize(path).into_os_string();
	if EntryKind::observe(path) == EntryKind::Directory {
		s.push("/");
	}
	s
}

fn read_back(file: &mut File) -> String {
	let mut text = String::new();
	if file.seek(SeekFrom::Start(0)).is_ok() {
		let _ = file.read_to_string(&mut text);
	}
	text
}


// vim: ts=4
