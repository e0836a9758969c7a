//! Colorized run reporting
//!
//! The engine reports through this collaborator and never writes to
//! the terminal itself. Pair lines are indented four columns per
//! recursion level; the destination root can be abbreviated to a short
//! label to keep lines readable. Persistent record keeping is the
//! tracing subscriber's concern.

use colored::{ColoredString, Colorize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::entry::EntryKind;

/// How the destination half of a pair line is accented
#[derive(Debug, Clone, Copy)]
pub enum Accent {
	/// Nothing special
	Plain,
	/// Destination missing: the move is safe
	Dim,
	/// Content conflict
	Conflict,
}

pub struct Reporter {
	dest_root: PathBuf,
	dest_label: Option<String>,
}

impl Reporter {
	pub fn new(dest_root: &Path, dest_label: Option<&str>) -> Self {
		Reporter {
			dest_root: dest_root.to_path_buf(),
			dest_label: dest_label.map(|s| s.to_string()),
		}
	}

	/// Print a `src ?--> dest` pair line, without a trailing newline:
	/// the verdict or question text continues the line.
	pub fn pair(&self, depth: usize, src: &Path, dest: &Path, accent: Accent) {
		let indent = " ".repeat(depth * 4);
		let src_text = format!("{}{}", src.display(), EntryKind::observe(src).mark());
		let dest_text = format!("{}{}", self.abbrev(dest), EntryKind::observe(dest).mark());
		let dest_text: ColoredString = match accent {
			Accent::Plain => dest_text.normal(),
			Accent::Dim => dest_text.dimmed(),
			Accent::Conflict => dest_text.red(),
		};
		print!("{}{} ?--> {}", indent, src_text, dest_text);
		let _ = std::io::stdout().flush();
		info!(target: "mergr::log", "{}{} ?--> {}", indent, src_text, self.abbrev(dest));
	}

	/// Print a full line and log it
	pub fn note(&self, message: &str) {
		println!("{}", message);
		info!(target: "mergr::log", "{}", message);
	}

	/// Display form of a destination path, with the root swapped for
	/// the configured label
	pub fn abbrev(&self, path: &Path) -> String {
		if let Some(label) = &self.dest_label {
			if let Ok(rest) = path.strip_prefix(&self.dest_root) {
				if rest.as_os_str().is_empty() {
					return label.clone();
				}
				return format!("{}/{}", label, rest.display());
			}
		}
		path.display().to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_abbrev_replaces_dest_root() {
		let reporter = Reporter::new(Path::new("/backup/archive"), Some("DEST"));
		assert_eq!(reporter.abbrev(Path::new("/backup/archive/a/b")), "DEST/a/b");
		assert_eq!(reporter.abbrev(Path::new("/backup/archive")), "DEST");
		assert_eq!(reporter.abbrev(Path::new("/elsewhere/a")), "/elsewhere/a");
	}

	#[test]
	fn test_abbrev_without_label_is_plain() {
		let reporter = Reporter::new(Path::new("/backup/archive"), None);
		assert_eq!(reporter.abbrev(Path::new("/backup/archive/a")), "/backup/archive/a");
	}
}

// vim: ts=4
