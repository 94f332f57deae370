use std::{
	path::{Path, PathBuf},
	time::Instant,
};

use thoughts_utils::{is_hidden_name, FileIOError};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::{FileDetails, SnapshotError};

/// One-shot recursive inventory of a directory.
///
/// Produces the root itself plus every non-hidden descendant. Hidden directories are pruned
/// along with everything beneath them. The walk is all-or-nothing: if any entry cannot be
/// read, the whole snapshot fails and the caller decides whether to retry.
#[derive(Debug, Clone)]
pub struct DirectorySnapshotter {
	directory: PathBuf,
	owner: PathBuf,
}

impl DirectorySnapshotter {
	/// Snapshot `directory`, attributing every entry to the `owner` scan root.
	pub fn new(directory: impl Into<PathBuf>, owner: impl Into<PathBuf>) -> Self {
		Self {
			directory: directory.into(),
			owner: owner.into(),
		}
	}

	/// Snapshot a scan root, which owns itself.
	pub fn for_root(root: impl AsRef<Path>) -> Self {
		let root = root.as_ref();
		Self::new(root, root)
	}

	pub fn snapshot(&self) -> Result<Vec<FileDetails>, SnapshotError> {
		let started_at = Instant::now();

		let root_metadata = std::fs::metadata(&self.directory)
			.map_err(|e| FileIOError::from((&self.directory, e)))?;
		if !root_metadata.is_dir() {
			return Err(SnapshotError::NotADirectory(self.directory.as_path().into()));
		}

		let mut files = Vec::new();
		for entry in WalkDir::new(&self.directory)
			.follow_links(false)
			.into_iter()
			.filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
		{
			let entry = entry?;
			let metadata = entry.metadata()?;
			files.push(FileDetails::from_metadata(
				entry.path(),
				&self.owner,
				&metadata,
			)?);
		}

		debug!(
			directory = %self.directory.display(),
			files = files.len(),
			elapsed = ?started_at.elapsed(),
			"Directory snapshot complete;"
		);

		Ok(files)
	}
}

fn is_hidden(entry: &DirEntry) -> bool {
	is_hidden_name(entry.file_name())
}
