use std::{
	fmt,
	path::{Path, PathBuf},
};

use thiserror::Error;
use thoughts_utils::FileIOError;

#[derive(Debug, Error)]
pub enum RootFolderError {
	#[error("notes folder is not a directory: <path='{}'>", .0.display())]
	NotADirectory(Box<Path>),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

/// The folder notes are written to and tags are collected from.
///
/// Always canonical, so paths reported by the file system watcher line up with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootFolder(PathBuf);

impl RootFolder {
	pub fn new(path: impl AsRef<Path>) -> Result<Self, RootFolderError> {
		let path = path.as_ref();
		let canonical = path
			.canonicalize()
			.map_err(|e| FileIOError::from_std_io_err_with_msg(path, e, "resolving notes folder"))?;

		if !canonical.is_dir() {
			return Err(RootFolderError::NotADirectory(canonical.into()));
		}

		Ok(Self(canonical))
	}

	pub fn path(&self) -> &Path {
		&self.0
	}
}

impl AsRef<Path> for RootFolder {
	fn as_ref(&self) -> &Path {
		&self.0
	}
}

impl fmt::Display for RootFolder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.display())
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::tempdir;

	use super::*;

	#[test]
	fn canonicalizes_existing_directories() {
		let dir = tempdir().unwrap();
		fs::create_dir(dir.path().join("notes")).unwrap();

		let root = RootFolder::new(dir.path().join("notes").join("..").join("notes")).unwrap();
		assert_eq!(root.path(), dir.path().canonicalize().unwrap().join("notes"));
	}

	#[test]
	fn rejects_files_and_missing_paths() {
		let dir = tempdir().unwrap();
		fs::write(dir.path().join("a.md"), "a").unwrap();

		assert!(matches!(
			RootFolder::new(dir.path().join("a.md")),
			Err(RootFolderError::NotADirectory(_))
		));
		assert!(matches!(
			RootFolder::new(dir.path().join("missing")),
			Err(RootFolderError::FileIO(e)) if e.is_not_found()
		));
	}
}
