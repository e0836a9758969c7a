//! The decision oracle driving the walk
//!
//! The engine needs a source of answers, not a terminal. The
//! interactive prompt, the dry-run and assume-yes modes and the
//! scripted test oracle all sit behind one trait; the engine never
//! learns which one it is talking to.

use colored::Colorize;
use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use termios::{tcsetattr, Termios, ECHO, ICANON, TCSANOW};
use tracing::info;

use crate::config::Config;

/// One recognized answer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
	Yes,
	No,
	Delete,
	Diff,
	Check,
	Open,
	Skip,
}

impl Answer {
	/// The one-letter token shown in prompts and accepted as input
	pub fn token(self) -> char {
		match self {
			Answer::Yes => 'y',
			Answer::No => 'n',
			Answer::Delete => 'd',
			Answer::Diff => 'f',
			Answer::Check => 'c',
			Answer::Open => 'o',
			Answer::Skip => 's',
		}
	}

	/// Parse one line of input against the recognized set.
	///
	/// Empty input and a literal `y` both mean the affirmative (the
	/// first allowed answer). Anything unrecognized yields None and the
	/// caller falls back to the step's no-op.
	pub(crate) fn parse(input: &str, allowed: &[Answer]) -> Option<Answer> {
		let input = input.trim().to_lowercase();
		if input.is_empty() {
			return allowed.first().copied();
		}
		let ch = input.chars().next()?;
		if let Some(answer) = allowed.iter().copied().find(|a| a.token() == ch) {
			return Some(answer);
		}
		if ch == 'y' {
			return allowed.first().copied();
		}
		None
	}
}

/// The abstracted source of answers for one walk.
///
/// `allowed` lists the recognized answers for the step, affirmative
/// first; `no_op` is the answer that changes nothing and is the default
/// for anything unrecognized.
pub trait AnswerOracle {
	fn ask(&mut self, question: &str, allowed: &[Answer], no_op: Answer) -> Answer;
}

/// Interactive oracle honoring the dry-run and assume-yes modes.
///
/// In dry-run mode every question is auto-answered with its no-op and
/// still printed and logged, so the run stays auditable. In assume-yes
/// mode the affirmative is taken without consulting any input source.
pub struct PromptOracle {
	dry_run: bool,
	assume_yes: bool,
}

impl PromptOracle {
	pub fn new(config: &Config) -> Self {
		PromptOracle { dry_run: config.dry_run, assume_yes: config.assume_yes }
	}
}

impl AnswerOracle for PromptOracle {
	fn ask(&mut self, question: &str, allowed: &[Answer], no_op: Answer) -> Answer {
		if self.dry_run {
			let token = no_op.token().to_string();
			println!("{} {}", question, token.green().bold());
			record(question, no_op);
			return no_op;
		}
		if self.assume_yes {
			let answer = allowed.first().copied().unwrap_or(no_op);
			println!("{} {}", question, answer.token().to_string().red().bold());
			record(question, answer);
			return answer;
		}

		print!("{} ", question);
		let _ = io::stdout().flush();
		let answer = Answer::parse(&read_answer(), allowed).unwrap_or(no_op);
		record(question, answer);
		answer
	}
}

fn record(question: &str, answer: Answer) {
	info!(target: "mergr::qa", "{} -> {}", question, answer.token());
}

/// Read one answer: a single keystroke when stdin is a terminal, a
/// whole line otherwise.
fn read_answer() -> String {
	if let Some(_guard) = TerminalGuard::new() {
		let mut byte = [0u8; 1];
		match io::stdin().read(&mut byte) {
			Ok(1) if byte[0] != b'\n' && byte[0] != b'\r' => {
				let ch = byte[0] as char;
				println!("{}", ch);
				ch.to_string()
			}
			_ => {
				println!();
				String::new()
			}
		}
	} else {
		let mut line = String::new();
		let _ = io::stdin().lock().read_line(&mut line);
		line
	}
}

/// RAII guard for raw terminal input mode.
/// Disables line buffering (ICANON) and character echo (ECHO) and
/// restores the original settings on drop.
struct TerminalGuard {
	fd: i32,
	original: Termios,
}

impl TerminalGuard {
	/// Enable raw mode on stdin; None when stdin is not a terminal
	fn new() -> Option<Self> {
		let fd = 0; // stdin
		let original = match Termios::from_fd(fd) {
			Ok(term) => term,
			Err(_) => return None,
		};
		let mut raw = original;
		raw.c_lflag &= !(ICANON | ECHO);
		if tcsetattr(fd, TCSANOW, &raw).is_err() {
			return None;
		}
		Some(TerminalGuard { fd, original })
	}
}

impl Drop for TerminalGuard {
	fn drop(&mut self) {
		let _ = tcsetattr(self.fd, TCSANOW, &self.original);
	}
}

/// Scripted oracle for tests and unattended runs: answers are consumed
/// in order; once exhausted, or when a scripted answer is not in the
/// allowed set, the step's no-op applies. Questions are kept for
/// inspection.
pub struct ScriptedOracle {
	answers: VecDeque<Answer>,
	pub questions: Vec<String>,
}

impl ScriptedOracle {
	pub fn new(answers: &[Answer]) -> Self {
		ScriptedOracle { answers: answers.iter().copied().collect(), questions: Vec::new() }
	}
}

impl AnswerOracle for ScriptedOracle {
	fn ask(&mut self, question: &str, allowed: &[Answer], no_op: Answer) -> Answer {
		self.questions.push(question.to_string());
		match self.answers.pop_front() {
			Some(answer) if allowed.contains(&answer) => answer,
			_ => no_op,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_empty_is_affirmative() {
		let allowed = [Answer::Yes, Answer::No];
		assert_eq!(Answer::parse("", &allowed), Some(Answer::Yes));
		assert_eq!(Answer::parse("\n", &allowed), Some(Answer::Yes));
	}

	#[test]
	fn test_parse_y_is_affirmative_even_when_not_listed() {
		let allowed = [Answer::Delete, Answer::Diff, Answer::No];
		assert_eq!(Answer::parse("y", &allowed), Some(Answer::Delete));
	}

	#[test]
	fn test_parse_tokens() {
		let allowed = [Answer::Check, Answer::Open, Answer::Skip];
		assert_eq!(Answer::parse("c", &allowed), Some(Answer::Check));
		assert_eq!(Answer::parse("O", &allowed), Some(Answer::Open));
		assert_eq!(Answer::parse("s\n", &allowed), Some(Answer::Skip));
	}

	#[test]
	fn test_parse_unrecognized_is_none() {
		let allowed = [Answer::Yes, Answer::No];
		assert_eq!(Answer::parse("x", &allowed), None);
		assert_eq!(Answer::parse("d", &allowed), None);
	}

	#[test]
	fn test_dry_run_always_no_op() {
		let config = Config { dry_run: true, ..Config::default() };
		let mut oracle = PromptOracle::new(&config);
		let answer = oracle.ask("Delete? [Y/n]", &[Answer::Yes, Answer::No], Answer::No);
		assert_eq!(answer, Answer::No);
	}

	#[test]
	fn test_assume_yes_is_affirmative() {
		let config = Config { assume_yes: true, ..Config::default() };
		let mut oracle = PromptOracle::new(&config);
		let answer = oracle.ask("Delete? [Y/n]", &[Answer::Yes, Answer::No], Answer::No);
		assert_eq!(answer, Answer::Yes);
	}

	#[test]
	fn test_scripted_oracle_order_and_exhaustion() {
		let mut oracle = ScriptedOracle::new(&[Answer::Yes, Answer::No]);
		let allowed = [Answer::Yes, Answer::No];
		assert_eq!(oracle.ask("q1", &allowed, Answer::No), Answer::Yes);
		assert_eq!(oracle.ask("q2", &allowed, Answer::No), Answer::No);
		// exhausted: no-op
		assert_eq!(oracle.ask("q3", &allowed, Answer::No), Answer::No);
		assert_eq!(oracle.questions.len(), 3);
	}

	#[test]
	fn test_scripted_oracle_disallowed_answer_becomes_no_op() {
		let mut oracle = ScriptedOracle::new(&[Answer::Diff]);
		let answer = oracle.ask("q", &[Answer::Yes, Answer::No], Answer::No);
		assert_eq!(answer, Answer::No);
	}
}

// vim: ts=4
