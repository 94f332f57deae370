use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;

static UTC_OFFSET: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"T[\d:.,]+([+±−-])(\d\d):?(\d\d)?$").expect("UTC offset pattern is valid")
});

/// Extracts the UTC offset of an ISO 8601 timestamp.
///
/// Accepts a `Z` suffix and `±hh`, `±hh:mm` or `±hhmm` designators after the time. Both
/// hyphen-minus and the unicode minus sign are understood; `±` is only valid for a zero offset.
/// Returns `None` when the timestamp carries no (valid) offset.
pub fn offset_from_iso8601(timestamp: &str) -> Option<FixedOffset> {
	if timestamp.ends_with('Z') {
		return FixedOffset::east_opt(0);
	}

	let captures = UTC_OFFSET.captures(timestamp)?;
	let hours = captures.get(2)?.as_str().parse::<i32>().ok()?;
	let minutes = match captures.get(3) {
		Some(minutes) => minutes.as_str().parse::<i32>().ok()?,
		None => 0,
	};
	let seconds = hours * 3600 + minutes * 60;

	let seconds = match captures.get(1)?.as_str() {
		"-" | "−" => -seconds,
		"±" if seconds != 0 => return None,
		_ => seconds,
	};

	FixedOffset::east_opt(seconds)
}
