use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::exit;

use mergr::config::Config;
use mergr::engine::Engine;
use mergr::logging;
use mergr::oracle::PromptOracle;

fn main() {
	if let Err(err) = run() {
		eprintln!("{} {}", "fatal:".red().bold(), err);
		exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("MergR")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Trims away the source directory by moving its unique content into \
			 the destination directory.  Duplicate content is discarded.",
		)
		.arg(Arg::new("source").required(true).value_name("SOURCE"))
		.arg(Arg::new("destination").required(true).value_name("DESTINATION"))
		.arg(
			Arg::new("dryrun")
				.short('n')
				.long("dryrun")
				.action(ArgAction::SetTrue)
				.help("Don't change anything"),
		)
		.arg(
			Arg::new("yes")
				.short('y')
				.long("yes")
				.action(ArgAction::SetTrue)
				.help("Force answer of yes to questions"),
		)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Config file (default ~/.config/mergr/config.toml)"),
		)
		.arg(
			Arg::new("comparator")
				.long("comparator")
				.value_name("BIN")
				.help("External recursive compare tool (default diff)"),
		)
		.arg(
			Arg::new("log-file")
				.long("log-file")
				.value_name("FILE")
				.help("Append a plain-text record of the run"),
		)
		.arg(
			Arg::new("dest-label")
				.long("dest-label")
				.value_name("LABEL")
				.help("Abbreviation for the destination root in output"),
		)
		.get_matches();

	let mut config = Config::load(matches.get_one::<String>("config").map(Path::new))?;
	config.dry_run |= matches.get_flag("dryrun");
	config.assume_yes |= matches.get_flag("yes");
	if let Some(bin) = matches.get_one::<String>("comparator") {
		config.comparator = PathBuf::from(bin);
	}
	if let Some(file) = matches.get_one::<String>("log-file") {
		config.log_file = Some(PathBuf::from(file));
	}
	if let Some(label) = matches.get_one::<String>("dest-label") {
		config.dest_label = Some(label.clone());
	}

	logging::init_tracing(config.log_file.as_deref());

	let source =
		PathBuf::from(matches.get_one::<String>("source").ok_or("source argument required")?);
	let destination = PathBuf::from(
		matches.get_one::<String>("destination").ok_or("destination argument required")?,
	);

	println!(
		"Merging {} ({}) to {} ({})\n",
		source.display().to_string().white().bold(),
		absolute(&source).display(),
		destination.display().to_string().white().bold(),
		absolute(&destination).display()
	);

	let mut oracle = PromptOracle::new(&config);
	let mut engine = Engine::new(&config, &mut oracle)?;
	engine.run(&source, &destination)?;
	Ok(())
}

fn absolute(path: &Path) -> PathBuf {
	std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// vim: ts=4
