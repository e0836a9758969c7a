//! Safe remove and move primitives
//!
//! Wraps the bare OS operations with the repair ladder: intercept the
//! known permission failure modes, repair attributes, retry once,
//! escalate. Races with earlier decisions in the same walk (sidecar
//! files that vanish with their primary) are benign skips, not errors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entry::{self, EntryKind};
use crate::error::MergeError;
use crate::progress::Spinner;
use crate::unstick;

pub struct FileOps {
	remover: PathBuf,
	mover: PathBuf,
	spinner: Spinner,
}

impl FileOps {
	pub fn new(config: &Config) -> Self {
		FileOps {
			remover: config.remover.clone(),
			mover: config.mover.clone(),
			spinner: Spinner::new(),
		}
	}

	/// Remove whatever `path` is (file, symlink, or directory tree).
	pub fn remove(&mut self, path: &Path) -> Result<(), MergeError> {
		match self.remove_once(path) {
			Ok(()) => {}
			Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
				// Often just an immutable flag; cheapest fix first.
				unstick::clear_immutable(path);
				if let Err(err) = self.remove_once(path) {
					debug!("retry after flag clear failed on {}: {}", path.display(), err);
				}
			}
			Err(err) => debug!("delete attempt on {} failed: {}", path.display(), err),
		}

		// A broken symlink fails ordinary existence checks but still
		// appears in listings; the non-dereferencing stat is the
		// arbiter of "still there".
		if !entry::exists_in_listing(path) {
			return Ok(());
		}

		unstick::unstick(path, &mut self.spinner)?;
		if let Err(err) = self.remove_once(path) {
			debug!("retry after attribute repair failed on {}: {}", path.display(), err);
		}
		if entry::exists_in_listing(path) {
			return Err(MergeError::Remove {
				path: path.to_path_buf(),
				detail: "still present after attribute repair and retry".to_string(),
			});
		}
		Ok(())
	}

	fn remove_once(&self, path: &Path) -> io::Result<()> {
		match EntryKind::observe(path) {
			EntryKind::Missing => Ok(()),
			EntryKind::Directory => self.delete_tree(path),
			EntryKind::Symlink => {
				info!("Deleting link {}", path.display());
				fs::remove_file(path)
			}
			_ => {
				info!("Deleting file {}", path.display());
				fs::remove_file(path)
			}
		}
	}

	// The platform recursive delete mishandles some metadata over
	// network mounts; the external delete-tree command is the one that
	// is known correct.
	fn delete_tree(&self, path: &Path) -> io::Result<()> {
		info!("Deleting dir {}/", path.display());
		let status = Command::new(&self.remover).arg("-rf").arg("--").arg(path).status()?;
		if status.success() {
			Ok(())
		} else {
			Err(io::Error::new(
				io::ErrorKind::PermissionDenied,
				format!("{} exited with {}", self.remover.display(), status),
			))
		}
	}

	/// Move `src` to `dst`.
	pub fn move_entry(&mut self, src: &Path, dst: &Path) -> Result<(), MergeError> {
		if entry::is_dead_symlink(dst) {
			// Disposable destination; not worth fighting over.
			warn!("{} is a dead symlink; leaving {} in place", dst.display(), src.display());
			return Ok(());
		}

		info!("Moving {} to {}", src.display(), dst.display());
		match fs::rename(src, dst) {
			Ok(()) => Ok(()),
			Err(ref err)
				if err.kind() == io::ErrorKind::NotFound && !entry::exists_in_listing(src) =>
			{
				// Vanished since we observed it: sidecar files go with
				// their primary. Benign.
				warn!("{} vanished before it could be moved", src.display());
				Ok(())
			}
			Err(ref err) if err.raw_os_error() == Some(libc::EXDEV) => self.move_across(src, dst),
			Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
				unstick::unstick(src, &mut self.spinner)?;
				fs::rename(src, dst).map_err(|e| MergeError::Move {
					src: src.to_path_buf(),
					dst: dst.to_path_buf(),
					source: e,
				})
			}
			Err(err) => Err(MergeError::Move {
				src: src.to_path_buf(),
				dst: dst.to_path_buf(),
				source: err,
			}),
		}
	}

	fn move_across(&self, src: &Path, dst: &Path) -> Result<(), MergeError> {
		let status = Command::new(&self.mover)
			.arg("--")
			.arg(src)
			.arg(dst)
			.status()
			.map_err(|e| MergeError::Spawn {
				command: self.mover.display().to_string(),
				source: e,
			})?;
		if status.success() {
			Ok(())
		} else {
			Err(MergeError::Move {
				src: src.to_path_buf(),
				dst: dst.to_path_buf(),
				source: io::Error::new(
					io::ErrorKind::Other,
					format!("{} exited with {}", self.mover.display(), status),
				),
			})
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::os::unix::fs::symlink;
	use tempfile::TempDir;

	fn ops() -> FileOps {
		FileOps::new(&Config::default())
	}

	#[test]
	fn test_remove_file() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("f");
		fs::write(&file, b"x").unwrap();
		ops().remove(&file).unwrap();
		assert!(!entry::exists_in_listing(&file));
	}

	#[test]
	fn test_remove_directory_tree() {
		let dir = TempDir::new().unwrap();
		let tree = dir.path().join("tree");
		fs::create_dir_all(tree.join("a/b")).unwrap();
		fs::write(tree.join("a/b/f"), b"x").unwrap();
		ops().remove(&tree).unwrap();
		assert!(!entry::exists_in_listing(&tree));
	}

	#[test]
	fn test_remove_dead_symlink() {
		let dir = TempDir::new().unwrap();
		let link = dir.path().join("dangling");
		symlink(dir.path().join("gone"), &link).unwrap();
		assert!(entry::exists_in_listing(&link));
		ops().remove(&link).unwrap();
		assert!(!entry::exists_in_listing(&link));
	}

	#[test]
	fn test_remove_missing_path_is_ok() {
		let dir = TempDir::new().unwrap();
		ops().remove(&dir.path().join("never-existed")).unwrap();
	}

	#[test]
	fn test_move_entry() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("src");
		let dst = dir.path().join("dst");
		fs::write(&src, b"payload").unwrap();
		ops().move_entry(&src, &dst).unwrap();
		assert!(!entry::exists_in_listing(&src));
		assert_eq!(fs::read(&dst).unwrap(), b"payload");
	}

	#[test]
	fn test_move_vanished_source_is_benign() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("sidecar");
		let dst = dir.path().join("dst");
		// src never existed: the rename race, compressed to its end state
		ops().move_entry(&src, &dst).unwrap();
		assert!(!entry::exists_in_listing(&dst));
	}

	#[test]
	fn test_move_onto_dead_symlink_is_skipped() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("src");
		fs::write(&src, b"payload").unwrap();
		let dst = dir.path().join("dst");
		symlink(dir.path().join("gone"), &dst).unwrap();

		ops().move_entry(&src, &dst).unwrap();
		// the move was skipped, nothing was clobbered
		assert!(entry::exists_in_listing(&src));
		assert!(entry::is_dead_symlink(&dst));
	}
}

// vim: ts=4
