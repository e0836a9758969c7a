//! The reconciliation walk
//!
//! One entry at a time, depth first, synchronous: every decision
//! mutates the tree the next classification observes, so there is
//! nothing to parallelize. Classification runs in a fixed order --
//! existence at the destination, then source emptiness/symlink-ness,
//! then content equivalence, then structural mismatch -- and each case
//! drives its own decision protocol through the oracle.

use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;
use tracing::warn;

use crate::bundles::BundleMatcher;
use crate::compare::{Checker, Verdict};
use crate::config::Config;
use crate::entry::{self, EntryKind};
use crate::error::MergeError;
use crate::fileops::FileOps;
use crate::humanize::{nice_delta, nice_size};
use crate::oracle::{Answer, AnswerOracle};
use crate::progress::Spinner;
use crate::report::{Accent, Reporter};

pub struct Engine<'a> {
	config: &'a Config,
	oracle: &'a mut dyn AnswerOracle,
	checker: Checker,
	ops: FileOps,
	bundles: BundleMatcher,
	spinner: Spinner,
}

impl<'a> Engine<'a> {
	pub fn new(config: &'a Config, oracle: &'a mut dyn AnswerOracle) -> Result<Self, MergeError> {
		Ok(Engine {
			config,
			oracle,
			checker: Checker::new(config),
			ops: FileOps::new(config),
			bundles: BundleMatcher::new(&config.bundle_suffixes)?,
			spinner: Spinner::new(),
		})
	}

	/// Reconcile `source` against `dest`.
	pub fn run(&mut self, source: &Path, dest: &Path) -> Result<(), MergeError> {
		let source = entry::normalize(source);
		let dest = entry::normalize(dest);

		if EntryKind::observe(&source) != EntryKind::Directory {
			return Err(MergeError::InvalidConfig {
				message: format!("source {} is not a directory", source.display()),
			});
		}
		if EntryKind::observe(&dest) != EntryKind::Directory {
			return Err(MergeError::InvalidConfig {
				message: format!("destination {} is not a directory", dest.display()),
			});
		}

		let reporter = Reporter::new(&dest, self.config.dest_label.as_deref());

		// An empty source needs no per-entry pass at all.
		if entry::list_entries(&source, &mut self.spinner)?.is_empty() {
			let question = format!("{} is empty.  Delete? [Y/n]", source.display());
			let answer = self.oracle.ask(&question, &[Answer::Yes, Answer::No], Answer::No);
			if answer == Answer::Yes {
				self.ops.remove(&source)?;
			}
			return Ok(());
		}

		self.walk(&source, &dest, 0, &reporter)
	}

	fn walk(
		&mut self,
		src_dir: &Path,
		dest_dir: &Path,
		depth: usize,
		reporter: &Reporter,
	) -> Result<(), MergeError> {
		for name in entry::list_entries(src_dir, &mut self.spinner)? {
			let src = entry::normalize(&src_dir.join(&name));
			let dest = entry::normalize(&dest_dir.join(&name));
			self.step(&src, &dest, depth, reporter)?;
		}
		Ok(())
	}

	/// Classify one reconciliation pair and drive its decision protocol.
	fn step(
		&mut self,
		src: &Path,
		dest: &Path,
		depth: usize,
		reporter: &Reporter,
	) -> Result<(), MergeError> {
		let src_kind = EntryKind::observe(src);

		match src_kind {
			EntryKind::Missing => {
				// Vanished between listing and classification: sidecar
				// files go with their primary. Benign.
				warn!("{} vanished mid-walk", src.display());
				return Ok(());
			}
			EntryKind::Socket => {
				reporter.note(&format!("Skipping socket {}", src.display()));
				return Ok(());
			}
			_ => {}
		}

		if src_kind == EntryKind::Symlink && entry::is_dead_symlink(src) {
			reporter.pair(depth, src, dest, Accent::Dim);
			let answer =
				self.oracle.ask("  Dead link.  Delete? [Y/n]", &[Answer::Yes, Answer::No], Answer::No);
			if answer == Answer::Yes {
				self.ops.remove(src)?;
			}
			return Ok(());
		}

		let dest_kind = EntryKind::observe(dest);

		if dest_kind == EntryKind::Missing || entry::is_dead_symlink(dest) {
			if entry::is_dead_symlink(dest) {
				let question =
					format!("{} is a dead link.  Delete it? [Y/n]", reporter.abbrev(dest));
				let answer = self.oracle.ask(&question, &[Answer::Yes, Answer::No], Answer::No);
				if answer == Answer::Yes {
					self.ops.remove(dest)?;
				}
			}
			reporter.pair(depth, src, dest, Accent::Dim);
			let answer =
				self.oracle.ask("  Safe.  Move? [Y/n]", &[Answer::Yes, Answer::No], Answer::No);
			if answer == Answer::Yes {
				self.ops.move_entry(src, dest)?;
			}
			return Ok(());
		}

		// Zero-byte file, empty directory or live symlink: one merged
		// check, one prompt wording.
		let reason = if src_kind == EntryKind::Symlink {
			Some("a symlink")
		} else if self.is_empty_source(src)? {
			Some("empty")
		} else {
			None
		};
		if let Some(reason) = reason {
			reporter.pair(depth, src, dest, Accent::Plain);
			let question = format!("  {} is {}.  Delete? [Y/D/n]", src.display(), reason);
			let answer = self.oracle.ask(
				&question,
				&[Answer::Yes, Answer::Delete, Answer::No],
				Answer::No,
			);
			if answer == Answer::Yes || answer == Answer::Delete {
				self.ops.remove(src)?;
			}
			return Ok(());
		}

		match self.checker.verdict(src, dest)? {
			Verdict::Identical => {
				reporter.pair(depth, src, dest, Accent::Plain);
				let answer = self.oracle.ask(
					"  Identical.  Delete? [Y/n]",
					&[Answer::Yes, Answer::No],
					Answer::No,
				);
				if answer == Answer::Yes {
					self.ops.remove(src)?;
				}
				Ok(())
			}
			Verdict::StructuralMismatch => Err(MergeError::StructuralConflict {
				source: src.to_path_buf(),
				dest: dest.to_path_buf(),
			}),
			Verdict::Differ => self.resolve_differing(src, dest, depth, reporter),
		}
	}

	fn is_empty_source(&mut self, path: &Path) -> Result<bool, MergeError> {
		match EntryKind::observe(path) {
			EntryKind::Directory => {
				Ok(entry::list_entries(path, &mut self.spinner)?.is_empty())
			}
			EntryKind::Regular | EntryKind::Executable => {
				Ok(fs::symlink_metadata(path)?.len() == 0)
			}
			_ => Ok(false),
		}
	}

	fn resolve_differing(
		&mut self,
		src: &Path,
		dest: &Path,
		depth: usize,
		reporter: &Reporter,
	) -> Result<(), MergeError> {
		reporter.pair(depth, src, dest, Accent::Conflict);
		reporter.note("  Differs.");

		let src_meta = fs::metadata(src)?;
		let dest_meta = fs::metadata(dest)?;
		let src_mtime = src_meta.modified()?;
		let dest_mtime = dest_meta.modified()?;

		// "Older" is decided purely by mtime; equal mtimes offer no
		// automatic winner and the operator must judge via diff.
		let older = self.report_mtimes(src, dest, src_mtime, dest_mtime, reporter);

		if src_meta.is_file() {
			let (asize, dsize) = (src_meta.len(), dest_meta.len());
			if asize == dsize {
				reporter.note(&format!("Both are {}.", nice_size(asize)));
			} else {
				reporter.note(&format!(
					"{} is {}, {} is {}.",
					src.display(),
					nice_size(asize),
					reporter.abbrev(dest),
					nice_size(dsize)
				));
			}
		}

		if src_meta.is_dir() && !self.bundles.is_bundle(src) {
			let src_count = entry::list_entries(src, &mut self.spinner)?.len();
			let dest_count = entry::list_entries(dest, &mut self.spinner)?.len();
			reporter.note(&format!(
				"{} holds {} entries, {} holds {}.",
				src.display(),
				src_count,
				reporter.abbrev(dest),
				dest_count
			));

			let answer = self.oracle.ask(
				"[C]heck inside, [o]pen in file manager, or [s]kip [Cos]?",
				&[Answer::Check, Answer::Open, Answer::Skip],
				Answer::Skip,
			);
			match answer {
				Answer::Check => self.walk(src, dest, depth + 1, reporter),
				Answer::Open => {
					self.open_externally(src);
					self.open_externally(dest);
					Ok(())
				}
				_ => {
					reporter.note("Skipping.");
					Ok(())
				}
			}
		} else {
			if src_meta.is_dir() {
				reporter.note(&format!("Treating {}/ as a unit.", src.display()));
			}
			self.offer_remove_older(src, dest, older, reporter)
		}
	}

	// Returns the older of the pair, or None when the mtimes are equal.
	fn report_mtimes<'p>(
		&self,
		src: &'p Path,
		dest: &'p Path,
		src_mtime: SystemTime,
		dest_mtime: SystemTime,
		reporter: &Reporter,
	) -> Option<&'p Path> {
		if src_mtime == dest_mtime {
			reporter.note("Both sides have the same modification time.");
			return None;
		}
		let (delta, relation, older) = if src_mtime > dest_mtime {
			(src_mtime.duration_since(dest_mtime).unwrap_or_default(), "newer", dest)
		} else {
			(dest_mtime.duration_since(src_mtime).unwrap_or_default(), "older", src)
		};
		let when: DateTime<Local> = dest_mtime.into();
		reporter.note(&format!(
			"{} is {} {} than {}{} ({}).",
			src.display(),
			nice_delta(delta),
			relation,
			reporter.abbrev(dest),
			EntryKind::observe(dest).mark(),
			when.format("%Y-%m-%d %H:%M:%S")
		));
		Some(older)
	}

	fn offer_remove_older(
		&mut self,
		src: &Path,
		dest: &Path,
		older: Option<&Path>,
		reporter: &Reporter,
	) -> Result<(), MergeError> {
		loop {
			let answer = match older {
				Some(older_path) => {
					let question = format!(
						"Delete older ({}{}) or show diff [D/n/f]?",
						reporter.abbrev(older_path),
						EntryKind::observe(older_path).mark()
					);
					self.oracle.ask(
						&question,
						&[Answer::Delete, Answer::Diff, Answer::No],
						Answer::No,
					)
				}
				// No winner to offer; the no-op leads so assume-yes
				// cannot destructively pick one.
				None => self.oracle.ask(
					"Show diff or skip [n/f]?",
					&[Answer::No, Answer::Diff],
					Answer::No,
				),
			};
			match answer {
				Answer::Delete => {
					if let Some(older_path) = older {
						self.ops.remove(older_path)?;
					}
					return Ok(());
				}
				Answer::Diff => self.checker.print_diff(src, dest)?,
				_ => return Ok(()),
			}
		}
	}

	fn open_externally(&self, path: &Path) {
		let mut command = Command::new(&self.config.opener);
		command.args(&self.config.opener_args).arg(path);
		if let Err(err) = command.status() {
			warn!("opener failed on {}: {}", path.display(), err);
		}
	}
}

// vim: ts=4
