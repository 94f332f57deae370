//! Notes as the user composes them, and their Markdown file on disk.
//!
//! A note lives in `<root>/<yyyy-MM-dd-HH-mm-ss>.md`, named after its creation instant in UTC,
//! and looks like:
//!
//! ```text
//! ---
//! date: 2024-03-01T10:30:00+01:00
//! tags:
//! - travel
//! location:
//!   latitude: 51.5
//!   longitude: -0.12
//! ---
//!
//! Body text.
//! ```

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use thoughts_utils::FileIOError;
use tracing::{debug, error, instrument, trace};

use crate::fs::write_atomically;

pub mod frontmatter;
mod regional_date;
mod timezone;

pub use frontmatter::Metadata;
pub use regional_date::RegionalDate;
pub use timezone::offset_from_iso8601;

const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S.md";

#[derive(Debug, Error)]
pub enum DocumentError {
	#[error("failed to encode note frontmatter: {0}")]
	Encode(#[source] serde_yaml::Error),
	#[error("failed to decode note frontmatter: {0}")]
	Decode(#[source] serde_yaml::Error),
	#[error("note has no frontmatter")]
	MissingFrontmatter,
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
	pub latitude: f64,
	pub longitude: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locality: Option<String>,
}

impl Location {
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self {
			latitude,
			longitude,
			name: None,
			locality: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
	Written(PathBuf),
	Deleted(PathBuf),
	/// Nothing to do: an empty note with no file, or a file already holding this note.
	Unchanged,
	/// The note could not be encoded; the file on disk was left alone.
	Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	/// Creation instant, in the offset the note was created in.
	pub date: DateTime<FixedOffset>,
	pub content: String,
	pub tags: Vec<String>,
	pub location: Option<Location>,
}

impl Document {
	pub fn new(date: DateTime<FixedOffset>) -> Self {
		Self {
			date,
			content: String::new(),
			tags: Vec::new(),
			location: None,
		}
	}

	pub fn now() -> Self {
		Self::new(Local::now().fixed_offset())
	}

	/// Splits free-form tag input (`"travel  food\tideas"`) into tags.
	pub fn parse_tags(tags: &str) -> Vec<String> {
		tags.split_whitespace().map(str::to_owned).collect()
	}

	/// Reads a note back from its file contents.
	pub fn parse(text: &str) -> Result<Self, DocumentError> {
		let (yaml, body) = frontmatter::split(text).ok_or(DocumentError::MissingFrontmatter)?;
		let metadata = serde_yaml::from_str::<Metadata>(yaml).map_err(DocumentError::Decode)?;

		Ok(Self {
			date: metadata.date.date(),
			content: body.to_owned(),
			tags: metadata.tags,
			location: metadata.location,
		})
	}

	/// Empty notes are never kept on disk.
	pub fn is_empty(&self) -> bool {
		self.content.is_empty()
	}

	pub fn filename(&self) -> String {
		self.date
			.with_timezone(&Utc)
			.format(FILENAME_FORMAT)
			.to_string()
	}

	pub fn metadata(&self) -> Metadata {
		Metadata {
			date: RegionalDate::from(self.date),
			tags: self.tags.clone(),
			location: self.location.clone(),
		}
	}

	pub fn header(&self) -> Result<String, DocumentError> {
		let yaml = serde_yaml::to_string(&self.metadata()).map_err(DocumentError::Encode)?;
		Ok(format!("---\n{yaml}---\n"))
	}

	pub fn render(&self) -> Result<String, DocumentError> {
		Ok(format!("{}\n{}", self.header()?, self.content))
	}

	/// Brings the note's file under `root` in line with the note.
	///
	/// Callers are expected to debounce; every call touches the disk.
	#[instrument(skip_all, fields(root = %root.as_ref().display(), filename = %self.filename()))]
	pub fn sync(&self, root: impl AsRef<Path>) -> Result<SyncOutcome, DocumentError> {
		let path = root.as_ref().join(self.filename());

		if self.is_empty() {
			return match fs::remove_file(&path) {
				Ok(()) => {
					debug!("Removed emptied note;");
					Ok(SyncOutcome::Deleted(path))
				}
				Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SyncOutcome::Unchanged),
				Err(e) => Err(FileIOError::from((path, e)).into()),
			};
		}

		let contents = match self.render() {
			Ok(contents) => contents,
			Err(e) => {
				error!(?e, "Failed to render note, leaving file untouched;");
				return Ok(SyncOutcome::Skipped);
			}
		};

		match fs::read_to_string(&path) {
			Ok(existing) if existing == contents => {
				trace!("Note already up to date;");
				return Ok(SyncOutcome::Unchanged);
			}
			Ok(_) => {}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {}
			Err(e) => return Err(FileIOError::from((path, e)).into()),
		}

		write_atomically(&path, contents.as_bytes())?;
		debug!("Wrote note;");

		Ok(SyncOutcome::Written(path))
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::now()
	}
}
