//! Runtime configuration for merge runs
//!
//! The original process-wide mutable flags (assume-yes, dry-run, the
//! destination abbreviation) are re-architected as one explicit value
//! threaded through every engine call, so the engine is reusable and
//! testable without global reset between runs.
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (~/.config/mergr/config.toml)
//! 3. CLI flags (highest priority, applied in main)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// Configuration for one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Plan only: every question is auto-answered with its no-op token
	pub dry_run: bool,

	/// Answer every question with its affirmative token, consulting no input
	pub assume_yes: bool,

	/// External recursive content comparator (exit 0 = identical,
	/// 2 = error, other nonzero = differences)
	pub comparator: PathBuf,

	/// External delete-tree command used for directory removal
	pub remover: PathBuf,

	/// External move command used when a rename crosses devices
	pub mover: PathBuf,

	/// Command used to reveal a path in the file manager
	pub opener: PathBuf,

	/// Extra arguments passed to the opener before the path
	pub opener_args: Vec<String>,

	/// Directory name suffixes treated as opaque bundles rather than
	/// recursed into (version control, IDE projects, compiled bundles)
	pub bundle_suffixes: Vec<String>,

	/// Abbreviation shown in place of the destination root in reports
	pub dest_label: Option<String>,

	/// Poll interval while waiting on the comparator, in milliseconds
	pub poll_interval_ms: u64,

	/// Append a plain-text record of the run to this file
	pub log_file: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			dry_run: false,
			assume_yes: false,
			comparator: PathBuf::from("diff"),
			remover: PathBuf::from("rm"),
			mover: PathBuf::from("mv"),
			opener: default_opener(),
			opener_args: default_opener_args(),
			bundle_suffixes: vec![
				".git".to_string(),
				".svn".to_string(),
				".hg".to_string(),
				".xcodeproj".to_string(),
				".idea".to_string(),
				".app".to_string(),
				".framework".to_string(),
				".bundle".to_string(),
			],
			dest_label: None,
			poll_interval_ms: 150,
			log_file: None,
		}
	}
}

impl Config {
	/// Load configuration from `explicit`, or from the default location
	/// when no file is named. A missing file is not an error; defaults
	/// apply.
	pub fn load(explicit: Option<&Path>) -> Result<Config, MergeError> {
		let path = match explicit {
			Some(p) => p.to_path_buf(),
			None => match default_config_path() {
				Some(p) => p,
				None => return Ok(Config::default()),
			},
		};

		if !path.exists() {
			if explicit.is_some() {
				return Err(MergeError::InvalidConfig {
					message: format!("config file {} does not exist", path.display()),
				});
			}
			return Ok(Config::default());
		}

		let contents = fs::read_to_string(&path).map_err(|err| MergeError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), err),
		})?;
		toml::from_str(&contents).map_err(|err| MergeError::InvalidConfig {
			message: format!("cannot parse {}: {}", path.display(), err),
		})
	}
}

fn default_config_path() -> Option<PathBuf> {
	std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/mergr/config.toml"))
}

#[cfg(target_os = "macos")]
fn default_opener() -> PathBuf {
	PathBuf::from("open")
}

#[cfg(target_os = "macos")]
fn default_opener_args() -> Vec<String> {
	vec!["-R".to_string()]
}

#[cfg(not(target_os = "macos"))]
fn default_opener() -> PathBuf {
	PathBuf::from("xdg-open")
}

#[cfg(not(target_os = "macos"))]
fn default_opener_args() -> Vec<String> {
	Vec::new()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_safe() {
		let config = Config::default();
		assert!(!config.dry_run);
		assert!(!config.assume_yes);
		assert_eq!(config.comparator, PathBuf::from("diff"));
		assert!(config.poll_interval_ms >= 100 && config.poll_interval_ms <= 250);
		assert!(config.bundle_suffixes.iter().any(|s| s == ".git"));
	}

	#[test]
	fn test_parse_partial_toml() {
		let config: Config = toml::from_str(
			r#"
			dryRun = true
			bundleSuffixes = [".git"]
			pollIntervalMs = 200
			"#,
		)
		.unwrap();
		assert!(config.dry_run);
		assert_eq!(config.bundle_suffixes, vec![".git".to_string()]);
		assert_eq!(config.poll_interval_ms, 200);
		// untouched fields keep their defaults
		assert_eq!(config.comparator, PathBuf::from("diff"));
	}

	#[test]
	fn test_parse_empty_toml_is_default() {
		let config: Config = toml::from_str("").unwrap();
		assert_eq!(config.remover, PathBuf::from("rm"));
		assert!(config.dest_label.is_none());
	}

	#[test]
	fn test_missing_explicit_file_is_an_error() {
		let result = Config::load(Some(Path::new("/nonexistent/mergr/config.toml")));
		assert!(result.is_err());
	}
}

// vim: ts=4
