//! Opaque-bundle directory matching
//!
//! Some directory names are conventionally a single logical unit
//! (version-control directories, IDE projects, compiled bundles).
//! The walk never recurses into them; a differing bundle gets the
//! whole-file treatment instead. The suffix list is configuration,
//! since it is inherently platform/ecosystem-specific.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::error::MergeError;

pub struct BundleMatcher {
	set: GlobSet,
}

impl BundleMatcher {
	/// Compile a suffix list (".git", ".xcodeproj", ...) into a matcher
	pub fn new(suffixes: &[String]) -> Result<Self, MergeError> {
		let mut builder = GlobSetBuilder::new();
		for suffix in suffixes {
			let pattern = format!("*{}", suffix);
			let glob = Glob::new(&pattern).map_err(|e| MergeError::InvalidConfig {
				message: format!("bad bundle suffix {:?}: {}", suffix, e),
			})?;
			builder.add(glob);
		}
		let set = builder.build().map_err(|e| MergeError::InvalidConfig {
			message: format!("cannot build bundle matcher: {}", e),
		})?;
		Ok(BundleMatcher { set })
	}

	/// True when the final path segment matches a bundle suffix
	pub fn is_bundle(&self, path: &Path) -> bool {
		match path.file_name() {
			Some(name) => self.set.is_match(Path::new(name)),
			None => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn matcher() -> BundleMatcher {
		BundleMatcher::new(&[".git".to_string(), ".xcodeproj".to_string()]).unwrap()
	}

	#[test]
	fn test_suffix_matches() {
		let m = matcher();
		assert!(m.is_bundle(Path::new("/src/project/.git")));
		assert!(m.is_bundle(Path::new("repo.git")));
		assert!(m.is_bundle(Path::new("deep/tree/App.xcodeproj")));
	}

	#[test]
	fn test_non_bundles() {
		let m = matcher();
		assert!(!m.is_bundle(Path::new("/src/project/src")));
		assert!(!m.is_bundle(Path::new("mygit")));
		assert!(!m.is_bundle(Path::new("notes.txt")));
	}

	#[test]
	fn test_bad_suffix_is_config_error() {
		assert!(BundleMatcher::new(&["[".to_string()]).is_err());
	}
}

// vim: ts=4
