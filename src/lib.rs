//! # MergR - Interactive Directory Tree Reconciler
//!
//! MergR trims away a source directory by moving content unique to it
//! into a destination directory and discarding content an equivalent
//! of which already exists there, one entry at a time, until only the
//! things requiring human judgment remain.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mergr::config::Config;
//! use mergr::engine::Engine;
//! use mergr::oracle::PromptOracle;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//! 	let config = Config::default();
//! 	let mut oracle = PromptOracle::new(&config);
//! 	let mut engine = Engine::new(&config, &mut oracle)?;
//! 	engine.run("./attic".as_ref(), "./archive".as_ref())?;
//! 	Ok(())
//! }
//! ```
//!
//! Decisions come from an [`oracle::AnswerOracle`]; swap in
//! [`oracle::ScriptedOracle`] to drive a run without a terminal.

pub mod bundles;
pub mod compare;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod fileops;
pub mod humanize;
pub mod logging;
pub mod oracle;
pub mod progress;
pub mod report;
pub mod unstick;

// Re-export commonly used types
pub use config::Config;
pub use engine::Engine;
pub use error::MergeError;

// vim: ts=4
