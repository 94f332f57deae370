use std::path::Path;

use thiserror::Error;
use thoughts_utils::FileIOError;

#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("snapshot root is not a directory: <path='{}'>", .0.display())]
	NotADirectory(Box<Path>),
	#[error("failed to walk directory: {0}")]
	Walk(#[from] walkdir::Error),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

#[derive(Debug, Error)]
pub enum ScannerError {
	#[error("directory scanner is already started")]
	AlreadyStarted,
	#[error("failed to set up file system watcher: {0}")]
	Watcher(#[from] notify::Error),
	#[error("failed to snapshot scanner root: {0}")]
	Snapshot(#[from] SnapshotError),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("directory scanner stopped before startup completed")]
	Interrupted,
	#[error("directory walk task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}
