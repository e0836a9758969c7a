//! Error types for reconciliation runs

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for a merge run
///
/// Everything here is fatal by the time it surfaces: repairable
/// conditions are retried at the layer that can fix them and only
/// escalate when repair genuinely fails. Display output carries the
/// offending path(s), the attempted operation and the underlying
/// system error text, because that is what the operator sees before
/// the run terminates.
#[derive(Debug)]
pub enum MergeError {
	/// A directory could not be listed for a reason other than permissions
	ListDir { path: PathBuf, source: io::Error },

	/// Permission trouble was repaired in place; the observed state can
	/// no longer be trusted and the operator must rerun
	RetryAfterRepair { path: PathBuf },

	/// File vs. directory at the same relative path
	StructuralConflict { source: PathBuf, dest: PathBuf },

	/// The external comparator failed for a reason other than permissions
	Comparator { message: String },

	/// An external command could not be spawned
	Spawn { command: String, source: io::Error },

	/// A path still exists after delete attempts and attribute repair
	Remove { path: PathBuf, detail: String },

	/// A move failed even after attribute repair
	Move { src: PathBuf, dst: PathBuf, source: io::Error },

	/// Attribute repair could not make a path usable
	Unstick { path: PathBuf, remaining: String },

	/// Invalid configuration or arguments
	InvalidConfig { message: String },

	/// I/O error with no more specific classification
	Io(io::Error),
}

impl fmt::Display for MergeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MergeError::ListDir { path, source } => {
				write!(f, "Cannot list {}: {}", path.display(), source)
			}
			MergeError::RetryAfterRepair { path } => {
				write!(
					f,
					"Attributes on {} were repaired; rerun the merge to pick up the new state",
					path.display()
				)
			}
			MergeError::StructuralConflict { source, dest } => {
				write!(
					f,
					"Structural conflict: {} and {} are a file/directory pair; resolve by hand",
					source.display(),
					dest.display()
				)
			}
			MergeError::Comparator { message } => {
				write!(f, "Comparator failed, verdict cannot be trusted: {}", message)
			}
			MergeError::Spawn { command, source } => {
				write!(f, "Failed to spawn '{}': {}", command, source)
			}
			MergeError::Remove { path, detail } => {
				write!(f, "Cannot delete {}: {}", path.display(), detail)
			}
			MergeError::Move { src, dst, source } => {
				write!(f, "Cannot move {} to {}: {}", src.display(), dst.display(), source)
			}
			MergeError::Unstick { path, remaining } => {
				write!(f, "Cannot unstick {}: {}", path.display(), remaining)
			}
			MergeError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			MergeError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for MergeError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			MergeError::ListDir { source, .. } => Some(source),
			MergeError::Spawn { source, .. } => Some(source),
			MergeError::Move { source, .. } => Some(source),
			MergeError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for MergeError {
	fn from(e: io::Error) -> Self {
		MergeError::Io(e)
	}
}

// vim: ts=4
