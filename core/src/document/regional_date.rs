use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::timezone::offset_from_iso8601;

/// An instant together with the UTC offset it was recorded in.
///
/// Serialized as an RFC 3339 string in that offset (`Z` when it is UTC), so notes show the
/// wall-clock time the author saw.
#[derive(Debug, Clone, Copy)]
pub struct RegionalDate(DateTime<FixedOffset>);

impl RegionalDate {
	pub fn new<Tz: TimeZone>(date: DateTime<Tz>, offset: FixedOffset) -> Self {
		Self(date.with_timezone(&offset))
	}

	pub fn date(&self) -> DateTime<FixedOffset> {
		self.0
	}

	pub fn offset(&self) -> FixedOffset {
		*self.0.offset()
	}

	/// Parses an RFC 3339 timestamp, keeping its offset.
	pub fn parse(value: &str) -> Result<Self, chrono::ParseError> {
		let date = DateTime::parse_from_rfc3339(value)?;
		let offset = offset_from_iso8601(value).unwrap_or_else(|| Utc.fix());
		Ok(Self::new(date, offset))
	}
}

impl From<DateTime<FixedOffset>> for RegionalDate {
	fn from(date: DateTime<FixedOffset>) -> Self {
		Self(date)
	}
}

impl From<RegionalDate> for DateTime<FixedOffset> {
	fn from(date: RegionalDate) -> Self {
		date.0
	}
}

/// Equal only when both the instant and the offset match.
impl PartialEq for RegionalDate {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0 && self.offset() == other.offset()
	}
}

impl Eq for RegionalDate {}

impl fmt::Display for RegionalDate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
	}
}

impl Serialize for RegionalDate {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for RegionalDate {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = String::deserialize(deserializer)?;
		Self::parse(&value).map_err(de::Error::custom)
	}
}
