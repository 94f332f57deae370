use std::{
	fs::Metadata,
	path::{Path, PathBuf},
	time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thoughts_utils::FileIOError;
use uuid::Uuid;

/// Names one tracked entry within one scan root.
///
/// Stable while a file is edited in place; a rename yields a different identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
	pub owner: PathBuf,
	pub path: PathBuf,
}

impl Identifier {
	pub fn new(owner: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
		Self {
			owner: owner.into(),
			path: path.into(),
		}
	}

	/// Whether `self` lives strictly below `directory` (a plain component-wise prefix match).
	pub fn is_nested_under(&self, directory: &Path) -> bool {
		self.path != directory && self.path.starts_with(directory)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
	Markdown,
	Directory,
	Other,
}

impl ContentType {
	pub fn for_path(path: &Path, is_directory: bool) -> Self {
		if is_directory {
			return Self::Directory;
		}

		match path
			.extension()
			.and_then(|extension| extension.to_str())
			.map(str::to_ascii_lowercase)
			.as_deref()
		{
			Some("md" | "markdown") => Self::Markdown,
			_ => Self::Other,
		}
	}
}

/// Immutable description of one filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDetails {
	pub identifier: Identifier,
	pub uuid: Uuid,
	pub is_directory: bool,
	pub content_type: ContentType,
	/// Milliseconds since the Unix epoch.
	pub modified_at: i64,
}

impl FileDetails {
	pub fn new(
		owner: impl Into<PathBuf>,
		path: impl Into<PathBuf>,
		is_directory: bool,
		modified_at: i64,
	) -> Self {
		let identifier = Identifier::new(owner, path);
		let content_type = ContentType::for_path(&identifier.path, is_directory);
		Self {
			identifier,
			uuid: Uuid::new_v4(),
			is_directory,
			content_type,
			modified_at,
		}
	}

	/// Reads the metadata of `path` and builds a fresh record for it.
	///
	/// Symlinks are described as themselves, matching what the directory walk reports.
	pub fn from_path(path: impl AsRef<Path>, owner: impl AsRef<Path>) -> Result<Self, FileIOError> {
		let path = path.as_ref();
		let metadata = std::fs::symlink_metadata(path).map_err(|e| FileIOError::from((path, e)))?;
		Self::from_metadata(path, owner, &metadata)
	}

	pub fn from_metadata(
		path: impl AsRef<Path>,
		owner: impl AsRef<Path>,
		metadata: &Metadata,
	) -> Result<Self, FileIOError> {
		let path = path.as_ref();
		let modified = metadata.modified().map_err(|e| {
			FileIOError::from_std_io_err_with_msg(path, e, "reading modification time")
		})?;

		Ok(Self::new(
			owner.as_ref(),
			path,
			metadata.is_dir(),
			millis_since_epoch(modified),
		))
	}

	pub fn owner(&self) -> &Path {
		&self.identifier.owner
	}

	pub fn path(&self) -> &Path {
		&self.identifier.path
	}

	/// Change detection: same owner, path, content type and modification time.
	/// The uuid is deliberately not compared.
	pub fn equivalent(&self, other: &Self) -> bool {
		self.identifier == other.identifier
			&& self.content_type == other.content_type
			&& self.modified_at == other.modified_at
	}

	/// Returns a copy carrying `other`'s metadata while keeping this record's identity.
	#[must_use]
	pub fn applying(&self, other: &Self) -> Self {
		Self {
			identifier: self.identifier.clone(),
			uuid: self.uuid,
			is_directory: other.is_directory,
			content_type: other.content_type,
			modified_at: other.modified_at,
		}
	}
}

/// Floors `time` to whole milliseconds relative to the Unix epoch.
pub fn millis_since_epoch(time: SystemTime) -> i64 {
	match time.duration_since(UNIX_EPOCH) {
		Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
		Err(e) => {
			let before = e.duration();
			// Round away from zero so -0.5ms floors to -1ms instead of 0.
			let millis = before.as_millis() + u128::from(before.subsec_nanos() % 1_000_000 != 0);
			i64::try_from(millis).map_or(i64::MIN, |millis| -millis)
		}
	}
}
