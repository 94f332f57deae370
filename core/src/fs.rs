use std::{
	io::{self, Write},
	path::Path,
};

use thoughts_utils::FileIOError;

/// Replaces `path` with `contents` in one step.
///
/// The data goes to a dotfile next to the target which is then renamed over it, so watchers of
/// the folder only ever observe complete files and ignore the temporary one.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), FileIOError> {
	let directory = path.parent().ok_or_else(|| {
		FileIOError::from_std_io_err_with_msg(
			path,
			io::Error::new(io::ErrorKind::InvalidInput, "no parent directory"),
			"writing atomically",
		)
	})?;

	let mut file = tempfile::Builder::new()
		.prefix(".")
		.suffix(".tmp")
		.tempfile_in(directory)
		.map_err(|e| {
			FileIOError::from_std_io_err_with_msg(directory, e, "creating temporary file")
		})?;

	file.write_all(contents)
		.and_then(|()| file.as_file().sync_all())
		.map_err(|e| FileIOError::from((file.path(), e)))?;

	file.persist(path)
		.map_err(|e| FileIOError::from_std_io_err_with_msg(path, e.error, "replacing file"))?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::tempdir;

	use super::*;

	#[test]
	fn replaces_contents_without_leaving_temporaries() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("a.md");
		fs::write(&path, "old").unwrap();

		write_atomically(&path, b"new").unwrap();

		assert_eq!(fs::read_to_string(&path).unwrap(), "new");
		assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[test]
	fn missing_directory_reports_the_path() {
		let dir = tempdir().unwrap();
		let missing = dir.path().join("missing");

		let error = write_atomically(&missing.join("a.md"), b"new").unwrap_err();
		assert_eq!(&*error.path, missing.as_path());
	}
}
