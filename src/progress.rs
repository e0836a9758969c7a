//! Liveness feedback for slow external work
//!
//! A four-frame spinner drawn with carriage-return updates on stderr.
//! The original's restartable generator becomes a plain frame counter
//! advanced once per poll tick; the comparator poll loop and the
//! attribute-repair recursion both tick the same primitive.

use std::io::Write;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];

#[derive(Debug, Default)]
pub struct Spinner {
	frame: usize,
	drawn: bool,
}

impl Spinner {
	pub fn new() -> Self {
		Spinner { frame: 0, drawn: false }
	}

	/// Draw the current frame and advance to the next one
	pub fn tick(&mut self) {
		let mut err = std::io::stderr();
		let _ = write!(err, "\r{}", FRAMES[self.frame]);
		let _ = err.flush();
		self.frame = (self.frame + 1) % FRAMES.len();
		self.drawn = true;
	}

	/// Erase the spinner cell once the slow work is done
	pub fn finish(&mut self) {
		if self.drawn {
			let mut err = std::io::stderr();
			let _ = write!(err, "\r \r");
			let _ = err.flush();
			self.drawn = false;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_frames_rotate() {
		let mut spinner = Spinner::new();
		for _ in 0..5 {
			spinner.tick();
		}
		assert_eq!(spinner.frame, 1);
	}

	#[test]
	fn test_finish_resets_drawn_state() {
		let mut spinner = Spinner::new();
		spinner.tick();
		assert!(spinner.drawn);
		spinner.finish();
		assert!(!spinner.drawn);
		// finishing an undrawn spinner writes nothing and stays clean
		spinner.finish();
		assert!(!spinner.drawn);
	}
}

// vim: ts=4
