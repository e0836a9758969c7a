//! Attribute repair for stuck paths
//!
//! A delete or move that fails with a permission error is usually
//! blocked by an immutability flag, a deny ACL, extended attributes or
//! missing owner bits -- on the path itself or, at least as often, on
//! its parent. `unstick` clears all four, parent first, then the
//! target, then (for directories) everything beneath it. It keeps no
//! state between invocations and is idempotent on a clean tree.

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::entry::EntryKind;
use crate::error::MergeError;
use crate::progress::Spinner;

/// Make `path` and everything beneath it deletable and movable.
pub fn unstick(path: &Path, spinner: &mut Spinner) -> Result<(), MergeError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fix_one(parent)?;
		}
	}
	fix_one(path)?;
	if EntryKind::observe(path) == EntryKind::Directory {
		fix_tree(path, spinner)?;
	}
	spinner.finish();
	Ok(())
}

/// Clear only the immutable-flag case, without recursing. The delete
/// path uses this as its cheap first retry before a full repair.
pub fn clear_immutable(path: &Path) {
	if EntryKind::observe(path) != EntryKind::Symlink {
		flags::clear(path);
	}
}

fn fix_tree(dir: &Path, spinner: &mut Spinner) -> Result<(), MergeError> {
	spinner.tick();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		fix_one(&path)?;
		if EntryKind::observe(&path) == EntryKind::Directory {
			fix_tree(&path, spinner)?;
		}
	}
	Ok(())
}

// The four fixes, in an order where an early best-effort failure still
// leaves the later fixes a chance.
fn fix_one(path: &Path) -> Result<(), MergeError> {
	let kind = EntryKind::observe(path);
	if kind == EntryKind::Missing {
		return Ok(());
	}
	if kind != EntryKind::Symlink {
		flags::clear(path);
		ensure_owner_bits(path)?;
		acls::strip(path)?;
	}
	xattrs::strip(path)?;
	Ok(())
}

/// Owner read+write for files, read+write+execute for directories.
/// If the bits do not take when re-queried there is no point continuing
/// to delete something still unreadable.
fn ensure_owner_bits(path: &Path) -> Result<(), MergeError> {
	use std::os::unix::fs::PermissionsExt;

	let meta = match fs::symlink_metadata(path) {
		Ok(meta) => meta,
		Err(_) => return Ok(()), // vanished: nothing left to fix
	};
	let want = if meta.is_dir() { 0o700 } else { 0o600 };
	let mode = meta.permissions().mode();
	if mode & want == want {
		return Ok(());
	}

	let mut perms = meta.permissions();
	perms.set_mode(mode | want);
	if let Err(err) = fs::set_permissions(path, perms) {
		debug!("chmod failed on {}: {}", path.display(), err);
	}

	let now = fs::symlink_metadata(path).map(|m| m.permissions().mode()).unwrap_or(0);
	if now & want != want {
		return Err(MergeError::Unstick {
			path: path.to_path_buf(),
			remaining: format!("owner bits {:o} would not take (mode is {:o})", want, now & 0o7777),
		});
	}
	Ok(())
}

mod flags {
	use std::path::Path;
	use tracing::debug;

	/// Clear user/system immutable and append-only flags. Best-effort:
	/// the later fixes may still succeed without this one.
	#[cfg(target_os = "macos")]
	pub fn clear(path: &Path) {
		use std::ffi::CString;
		use std::os::macos::fs::MetadataExt;
		use std::os::unix::ffi::OsStrExt;

		let meta = match std::fs::symlink_metadata(path) {
			Ok(meta) => meta,
			Err(_) => return,
		};
		let stuck = libc::UF_IMMUTABLE | libc::UF_APPEND | libc::SF_IMMUTABLE | libc::SF_APPEND;
		let flags = meta.st_flags();
		if flags & stuck == 0 {
			return;
		}
		let cpath = match CString::new(path.as_os_str().as_bytes()) {
			Ok(cpath) => cpath,
			Err(_) => return,
		};
		if unsafe { libc::chflags(cpath.as_ptr(), flags & !stuck) } != 0 {
			debug!("chflags failed on {}: {}", path.display(), std::io::Error::last_os_error());
		}
	}

	/// EXT-style immutable/append flags live behind an ioctl on an open
	/// descriptor.
	#[cfg(target_os = "linux")]
	pub fn clear(path: &Path) {
		use std::fs::File;
		use std::os::unix::io::AsRawFd;

		let file = match File::open(path) {
			Ok(file) => file,
			Err(_) => return,
		};
		// These flag bits are a stable part of the Linux ABI (linux/fs.h)
		// but are not exported by the `libc` crate, so define them here.
		const FS_IMMUTABLE_FL: libc::c_long = 0x0000_0010;
		const FS_APPEND_FL: libc::c_long = 0x0000_0020;

		let fd = file.as_raw_fd();
		let mut attrs: libc::c_long = 0;
		if unsafe { libc::ioctl(fd, libc::FS_IOC_GETFLAGS, &mut attrs) } != 0 {
			return; // filesystem without attribute flags
		}
		let stuck = FS_IMMUTABLE_FL | FS_APPEND_FL;
		if attrs & stuck == 0 {
			return;
		}
		attrs &= !stuck;
		if unsafe { libc::ioctl(fd, libc::FS_IOC_SETFLAGS, &attrs) } != 0 {
			debug!(
				"FS_IOC_SETFLAGS failed on {}: {}",
				path.display(),
				std::io::Error::last_os_error()
			);
		}
	}

	#[cfg(not(any(target_os = "macos", target_os = "linux")))]
	pub fn clear(_path: &Path) {}
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "freebsd"))]
mod acls {
	use exacl::{AclEntry, AclEntryKind};
	use std::path::Path;
	use tracing::debug;

	use crate::error::MergeError;

	// Base entries mirror the mode bits (unnamed user/group/other allow
	// entries on Linux); everything else is extended and goes.
	fn is_extended(entry: &AclEntry) -> bool {
		!entry.allow
			|| !entry.name.is_empty()
			|| !matches!(
				entry.kind,
				AclEntryKind::User | AclEntryKind::Group | AclEntryKind::Other
			)
	}

	// The deny class. The generic rewrite is known not to clear these;
	// they get their own removal pass.
	fn is_deny(entry: &AclEntry) -> bool {
		!entry.allow
	}

	/// Strip ACL entries scoped to exactly this path (not its contents).
	pub fn strip(path: &Path) -> Result<(), MergeError> {
		let entries = match exacl::getfacl(path, None) {
			Ok(entries) => entries,
			Err(err) => {
				// Filesystems that report ACLs as unsupported are
				// treated as lacking ACLs.
				debug!("cannot read ACL on {}: {}", path.display(), err);
				return Ok(());
			}
		};
		if !entries.iter().any(is_extended) {
			return Ok(());
		}

		let base: Vec<AclEntry> = entries.iter().filter(|e| !is_extended(e)).cloned().collect();
		if let Err(err) = exacl::setfacl(&[path], &base, None) {
			debug!("ACL rewrite failed on {}: {}", path.display(), err);
		}

		let mut left = exacl::getfacl(path, None).unwrap_or_default();
		if left.iter().any(is_extended) {
			let kept: Vec<AclEntry> = left.iter().filter(|e| !is_deny(e)).cloned().collect();
			if let Err(err) = exacl::setfacl(&[path], &kept, None) {
				debug!("deny-entry removal failed on {}: {}", path.display(), err);
			}
			left = exacl::getfacl(path, None).unwrap_or_default();
			let stuck = left.iter().filter(|e| is_extended(e)).count();
			if stuck > 0 {
				return Err(MergeError::Unstick {
					path: path.to_path_buf(),
					remaining: format!("{} ACL entries survived removal", stuck),
				});
			}
		}
		Ok(())
	}
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "freebsd")))]
mod acls {
	use std::path::Path;

	use crate::error::MergeError;

	pub fn strip(_path: &Path) -> Result<(), MergeError> {
		Ok(())
	}
}

#[cfg(unix)]
mod xattrs {
	use std::ffi::OsString;
	use std::path::Path;
	use tracing::debug;

	use crate::error::MergeError;

	// Namespace rule: non-root on Linux can only touch user.*; root
	// everything except system.*. Other Unixes have no namespace model.
	#[cfg(target_os = "linux")]
	fn is_removable(name: &str) -> bool {
		if unsafe { libc::geteuid() } == 0 {
			!name.starts_with("system.")
		} else {
			name.starts_with("user.")
		}
	}

	#[cfg(not(target_os = "linux"))]
	fn is_removable(_name: &str) -> bool {
		true
	}

	fn removable_names(path: &Path) -> std::io::Result<Vec<OsString>> {
		Ok(xattr::list(path)?
			.filter(|name| is_removable(&name.to_string_lossy()))
			.collect())
	}

	/// Strip extended attributes scoped to exactly this path.
	pub fn strip(path: &Path) -> Result<(), MergeError> {
		let names = match removable_names(path) {
			Ok(names) => names,
			Err(err) => {
				debug!("cannot list xattrs on {}: {}", path.display(), err);
				return Ok(());
			}
		};
		if names.is_empty() {
			return Ok(());
		}
		for name in &names {
			if let Err(err) = xattr::remove(path, name) {
				debug!("cannot remove xattr {:?} on {}: {}", name, path.display(), err);
			}
		}
		let left = removable_names(path).unwrap_or_default();
		if !left.is_empty() {
			return Err(MergeError::Unstick {
				path: path.to_path_buf(),
				remaining: format!("{} extended attributes survived removal", left.len()),
			});
		}
		Ok(())
	}
}

#[cfg(not(unix))]
mod xattrs {
	use std::path::Path;

	use crate::error::MergeError;

	pub fn strip(_path: &Path) -> Result<(), MergeError> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::os::unix::fs::PermissionsExt;
	use tempfile::TempDir;

	#[test]
	fn test_unstick_clean_tree_is_idempotent() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("f"), b"x").unwrap();
		fs::create_dir(dir.path().join("d")).unwrap();
		fs::write(dir.path().join("d/g"), b"y").unwrap();

		let mut spinner = Spinner::new();
		unstick(dir.path(), &mut spinner).unwrap();
		unstick(dir.path(), &mut spinner).unwrap();
	}

	#[test]
	fn test_unstick_restores_owner_bits() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("locked");
		fs::write(&file, b"x").unwrap();
		fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();

		let mut spinner = Spinner::new();
		unstick(&file, &mut spinner).unwrap();

		let mode = fs::symlink_metadata(&file).unwrap().permissions().mode();
		assert_eq!(mode & 0o600, 0o600);
	}

	#[test]
	fn test_unstick_recurses_into_locked_subtrees() {
		let dir = TempDir::new().unwrap();
		let sub = dir.path().join("sub");
		fs::create_dir(&sub).unwrap();
		let inner = sub.join("inner");
		fs::write(&inner, b"x").unwrap();
		fs::set_permissions(&inner, fs::Permissions::from_mode(0o000)).unwrap();
		fs::set_permissions(&sub, fs::Permissions::from_mode(0o000)).unwrap();

		let mut spinner = Spinner::new();
		unstick(dir.path(), &mut spinner).unwrap();

		let sub_mode = fs::symlink_metadata(&sub).unwrap().permissions().mode();
		assert_eq!(sub_mode & 0o700, 0o700);
		let inner_mode = fs::symlink_metadata(&inner).unwrap().permissions().mode();
		assert_eq!(inner_mode & 0o600, 0o600);
	}

	#[test]
	fn test_unstick_strips_user_xattrs() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("tagged");
		fs::write(&file, b"x").unwrap();
		// Not every filesystem supports user xattrs; skip when this
		// one does not.
		if xattr::set(&file, "user.mergr-test", b"v").is_err() {
			return;
		}

		let mut spinner = Spinner::new();
		unstick(&file, &mut spinner).unwrap();

		let names: Vec<_> = xattr::list(&file).unwrap().collect();
		assert!(names.iter().all(|n| n.to_string_lossy() != "user.mergr-test"));
	}

	#[test]
	fn test_unstick_dead_symlink_is_fine() {
		use std::os::unix::fs::symlink;

		let dir = TempDir::new().unwrap();
		let link = dir.path().join("dangling");
		symlink(dir.path().join("gone"), &link).unwrap();

		let mut spinner = Spinner::new();
		unstick(&link, &mut spinner).unwrap();
		assert!(crate::entry::exists_in_listing(&link));
	}

	#[test]
	fn test_clear_immutable_on_plain_file_is_noop() {
		let dir = TempDir::new().unwrap();
		let file = dir.path().join("f");
		fs::write(&file, b"x").unwrap();
		clear_immutable(&file);
		assert!(file.exists());
	}
}

// vim: ts=4
