//! Filesystem entry observation
//!
//! Kind is derived live from a non-dereferencing stat each time it is
//! needed; the tree is mutated mid-walk by earlier decisions, so
//! nothing here caches. A symlink is reported as a symlink even when
//! its target is a directory.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

use crate::error::MergeError;
use crate::progress::Spinner;

/// What a path is, observed without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	Regular,
	Executable,
	Directory,
	Symlink,
	Socket,
	Fifo,
	Whiteout,
	Missing,
}

impl EntryKind {
	/// Observe the kind of `path` right now
	pub fn observe(path: &Path) -> EntryKind {
		use std::os::unix::fs::FileTypeExt;
		use std::os::unix::fs::PermissionsExt;

		let meta = match fs::symlink_metadata(path) {
			Ok(meta) => meta,
			Err(_) => return EntryKind::Missing,
		};
		let ft = meta.file_type();
		if ft.is_symlink() {
			EntryKind::Symlink
		} else if ft.is_dir() {
			EntryKind::Directory
		} else if ft.is_socket() {
			EntryKind::Socket
		} else if ft.is_fifo() {
			EntryKind::Fifo
		} else if is_whiteout(&meta) {
			EntryKind::Whiteout
		} else if ft.is_file() && meta.permissions().mode() & 0o111 != 0 {
			EntryKind::Executable
		} else {
			EntryKind::Regular
		}
	}

	/// A mark that indicates file type, or "" for ordinary files.
	///
	/// A slash (`/`) for directories, an asterisk (`*`) for
	/// executables, an at sign (`@`) for symbolic links, an equals sign
	/// (`=`) for sockets, a percent sign (`%`) for whiteouts and a
	/// vertical bar (`|`) for FIFOs.
	pub fn mark(self) -> &'static str {
		match self {
			EntryKind::Directory => "/",
			EntryKind::Executable => "*",
			EntryKind::Symlink => "@",
			EntryKind::Socket => "=",
			EntryKind::Whiteout => "%",
			EntryKind::Fifo => "|",
			EntryKind::Regular | EntryKind::Missing => "",
		}
	}
}

#[cfg(target_os = "macos")]
fn is_whiteout(meta: &fs::Metadata) -> bool {
	use std::os::unix::fs::MetadataExt;
	meta.mode() & libc::S_IFMT as u32 == libc::S_IFWHT as u32
}

#[cfg(not(target_os = "macos"))]
fn is_whiteout(_meta: &fs::Metadata) -> bool {
	false
}

/// A symlink whose target does not resolve. Such a link fails ordinary
/// existence checks but still appears in directory listings.
pub fn is_dead_symlink(path: &Path) -> bool {
	EntryKind::observe(path) == EntryKind::Symlink && !path.exists()
}

/// Existence by the non-dereferencing stat: a dead symlink still
/// "exists" for deletion purposes.
pub fn exists_in_listing(path: &Path) -> bool {
	fs::symlink_metadata(path).is_ok()
}

/// Lexically resolve `.` and `..` segments. No filesystem access, no
/// symlink resolution.
pub fn normalize(path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for comp in path.components() {
		match comp {
			Component::CurDir => {}
			Component::ParentDir => {
				if !out.pop() && !out.has_root() {
					out.push("..");
				}
			}
			other => out.push(other.as_os_str()),
		}
	}
	if out.as_os_str().is_empty() {
		out.push(".");
	}
	out
}

/// List a directory for the walk, in directory order.
///
/// A permission failure is repaired with `unstick` and then aborts the
/// run with a retry request: the filesystem may have changed underneath
/// the walk, so the operator reruns against the new state.
pub fn list_entries(path: &Path, spinner: &mut Spinner) -> Result<Vec<OsString>, MergeError> {
	match read_names(path) {
		Ok(names) => Ok(names),
		Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
			warn!("cannot list {}: {}", path.display(), err);
			crate::unstick::unstick(path, spinner)?;
			Err(MergeError::RetryAfterRepair { path: path.to_path_buf() })
		}
		Err(err) => Err(MergeError::ListDir { path: path.to_path_buf(), source: err }),
	}
}

fn read_names(path: &Path) -> io::Result<Vec<OsString>> {
	let mut names = Vec::new();
	for entry in fs::read_dir(path)? {
		names.push(entry?.file_name());
	}
	Ok(names)
}


// vim: ts=4
