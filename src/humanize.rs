//! Human-readable sizes and time deltas for differ reports

use std::time::Duration;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
// These are approximate:
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

/// Report bytes in appropriate units: GB, MB, KB or plain bytes.
pub fn nice_size(bytes: u64) -> String {
	if bytes >= GB {
		format!("{} GB", trim(bytes as f64 / GB as f64))
	} else if bytes >= MB {
		format!("{} MB", trim(bytes as f64 / MB as f64))
	} else if bytes >= KB {
		format!("{} KB", trim(bytes as f64 / KB as f64))
	} else {
		format!("{}B", bytes)
	}
}

// Two decimals, with one trailing zero dropped: 1.00 -> 1.0, 1.06 -> 1.06
fn trim(value: f64) -> String {
	let mut s = format!("{:.2}", value);
	if s.ends_with('0') {
		s.pop();
	}
	s
}

/// An approximate nice looking time delta string.
///
/// Only the two most significant nonzero units are shown; to be exact
/// we would need the two actual dates rather than the span between
/// them, and nobody reads past the second unit anyway.
pub fn nice_delta(delta: Duration) -> String {
	if delta < Duration::from_millis(10) {
		return "infinitesimal".to_string();
	}
	let mut secs = delta.as_secs();
	if secs == 0 {
		return format!("{}ms", delta.as_millis());
	}

	let units: [(u64, &str); 7] = [
		(YEAR, "Y"),
		(MONTH, "M"),
		(WEEK, "W"),
		(DAY, "d"),
		(HOUR, "h"),
		(MINUTE, "m"),
		(1, "s"),
	];

	let mut parts: Vec<String> = Vec::new();
	for (span, label) in units.iter() {
		if parts.len() == 2 {
			break;
		}
		let n = secs / span;
		if n > 0 {
			parts.push(format!("{}{}", n, label));
			secs -= n * span;
		}
	}
	parts.join(" ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_nice_size() {
		assert_eq!(nice_size(1_048_576), "1.0 MB");
		assert_eq!(nice_size(1_110_432), "1.06 MB");
		assert_eq!(nice_size(10 * 1024), "10.0 KB");
		assert_eq!(nice_size(512), "512B");
		assert_eq!(nice_size(0), "0B");
		assert_eq!(nice_size(3 * 1024 * 1024 * 1024), "3.0 GB");
	}

	#[test]
	fn test_nice_delta_two_most_significant_units() {
		let delta = Duration::from_secs(365 * 5 * 24 * 60 * 60 + 4000);
		assert_eq!(nice_delta(delta), "5Y 1h");

		let delta = Duration::from_secs(99_999_999);
		assert_eq!(nice_delta(delta), "3Y 2M");
	}

	#[test]
	fn test_nice_delta_small_spans() {
		assert_eq!(nice_delta(Duration::from_secs(42)), "42s");
		assert_eq!(nice_delta(Duration::from_secs(61)), "1m 1s");
		assert_eq!(nice_delta(Duration::from_millis(10)), "10ms");
		assert_eq!(nice_delta(Duration::from_millis(9)), "infinitesimal");
	}
}

// vim: ts=4
