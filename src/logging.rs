//! Tracing setup for merge runs.
//!
//! By default, logs at INFO level and above go to stderr. Control the
//! level with the `RUST_LOG` environment variable:
//!
//! ```bash
//! RUST_LOG=debug mergr ...
//! RUST_LOG=mergr::unstick=trace mergr ...
//! ```
//!
//! When a log file is configured, the record goes there instead, with
//! ANSI escape sequences disabled so the logfile stays clean.

use std::path::Path;
use std::sync::Arc;

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
pub fn init_tracing(log_file: Option<&Path>) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

	let file = log_file.and_then(|path| {
		std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
	});

	match file {
		Some(file) => {
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_ansi(false)
				.with_writer(Arc::new(file))
				.init();
		}
		None => {
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_writer(std::io::stderr)
				.init();
		}
	}
}

// vim: ts=4
