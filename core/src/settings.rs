//! Persistent key-value settings.

use std::{
	collections::{BTreeMap, HashMap},
	fs, io,
	path::{Path, PathBuf},
	sync::{Mutex, PoisonError},
};

use base64::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use thoughts_utils::FileIOError;
use tracing::{debug, warn};

use crate::fs::write_atomically;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
	RootFolder,
	ShouldSaveLocation,
}

impl SettingsKey {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RootFolder => "root_folder",
			Self::ShouldSaveLocation => "should_save_location",
		}
	}
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("failed to encode setting '{key}': {source}")]
	Encode {
		key: &'static str,
		#[source]
		source: serde_json::Error,
	},
	#[error("failed to decode setting '{key}': {source}")]
	Decode {
		key: &'static str,
		#[source]
		source: serde_json::Error,
	},
	#[error("failed to serialize settings file: {0}")]
	Serialize(#[source] serde_json::Error),
	#[error("settings file is corrupt: <path='{}'>: {reason}", .path.display())]
	Corrupt { path: Box<Path>, reason: String },
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

/// Opaque blobs stored under string keys.
pub trait SettingsStore: Send + Sync {
	fn get(&self, key: &str) -> Option<Vec<u8>>;

	fn set(&self, key: &str, value: Vec<u8>) -> Result<(), SettingsError>;

	fn remove(&self, key: &str) -> Result<(), SettingsError>;
}

/// Typed access to a [`SettingsStore`], values being JSON encoded.
pub trait SettingsStoreExt: SettingsStore {
	fn get_value<T: DeserializeOwned>(&self, key: SettingsKey) -> Result<Option<T>, SettingsError> {
		self.get(key.as_str())
			.map(|blob| {
				serde_json::from_slice(&blob).map_err(|source| SettingsError::Decode {
					key: key.as_str(),
					source,
				})
			})
			.transpose()
	}

	fn set_value<T: Serialize + ?Sized>(
		&self,
		key: SettingsKey,
		value: &T,
	) -> Result<(), SettingsError> {
		let blob = serde_json::to_vec(value).map_err(|source| SettingsError::Encode {
			key: key.as_str(),
			source,
		})?;
		self.set(key.as_str(), blob)
	}
}

impl<S: SettingsStore + ?Sized> SettingsStoreExt for S {}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
	values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySettingsStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SettingsStore for MemorySettingsStore {
	fn get(&self, key: &str) -> Option<Vec<u8>> {
		self.values
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(key)
			.cloned()
	}

	fn set(&self, key: &str, value: Vec<u8>) -> Result<(), SettingsError> {
		self.values
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(key.to_owned(), value);
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), SettingsError> {
		self.values
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(key);
		Ok(())
	}
}

/// Settings kept in a JSON object of base64 blobs, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
	path: PathBuf,
	values: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl JsonFileSettingsStore {
	/// Loads `path`, starting empty when it does not exist yet.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();

		let values = match fs::read(&path) {
			Ok(contents) => decode(&path, &contents)?,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!(path = %path.display(), "No settings file yet, starting empty;");
				BTreeMap::new()
			}
			Err(e) => return Err(FileIOError::from((&path, e)).into()),
		};

		Ok(Self {
			path,
			values: Mutex::new(values),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn update(&self, change: impl FnOnce(&mut BTreeMap<String, Vec<u8>>)) -> Result<(), SettingsError> {
		let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

		// Changes only become visible once they are on disk.
		let mut updated = values.clone();
		change(&mut updated);

		let encoded = updated
			.iter()
			.map(|(key, value)| (key.as_str(), BASE64_STANDARD.encode(value)))
			.collect::<BTreeMap<_, _>>();

		let contents = serde_json::to_vec_pretty(&encoded).map_err(SettingsError::Serialize)?;

		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).map_err(|e| FileIOError::from((parent, e)))?;
		}

		write_atomically(&self.path, &contents).map_err(|e| {
			warn!(?e, "Failed to persist settings;");
			SettingsError::from(e)
		})?;

		*values = updated;

		Ok(())
	}
}

fn decode(path: &Path, contents: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, SettingsError> {
	let corrupt = |reason: String| SettingsError::Corrupt {
		path: path.into(),
		reason,
	};

	serde_json::from_slice::<BTreeMap<String, String>>(contents)
		.map_err(|e| corrupt(e.to_string()))?
		.into_iter()
		.map(|(key, value)| {
			BASE64_STANDARD
				.decode(value)
				.map(|blob| (key, blob))
				.map_err(|e| corrupt(e.to_string()))
		})
		.collect()
}

impl SettingsStore for JsonFileSettingsStore {
	fn get(&self, key: &str) -> Option<Vec<u8>> {
		self.values
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(key)
			.cloned()
	}

	fn set(&self, key: &str, value: Vec<u8>) -> Result<(), SettingsError> {
		self.update(|values| {
			values.insert(key.to_owned(), value);
		})
	}

	fn remove(&self, key: &str) -> Result<(), SettingsError> {
		self.update(|values| {
			values.remove(key);
		})
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use pretty_assertions::assert_eq;
	use tempfile::tempdir;

	use super::*;

	#[test]
	fn typed_values_round_trip() {
		let store = MemorySettingsStore::new();
		assert_eq!(store.get_value::<bool>(SettingsKey::ShouldSaveLocation).unwrap(), None);

		store.set_value(SettingsKey::ShouldSaveLocation, &true).unwrap();
		store
			.set_value(SettingsKey::RootFolder, Path::new("/notes"))
			.unwrap();

		assert_eq!(
			store.get_value::<bool>(SettingsKey::ShouldSaveLocation).unwrap(),
			Some(true)
		);
		assert_eq!(
			store.get_value::<PathBuf>(SettingsKey::RootFolder).unwrap(),
			Some(PathBuf::from("/notes"))
		);

		store.remove(SettingsKey::RootFolder.as_str()).unwrap();
		assert_eq!(store.get_value::<PathBuf>(SettingsKey::RootFolder).unwrap(), None);
	}

	#[test]
	fn mistyped_values_fail_to_decode() {
		let store = MemorySettingsStore::new();
		store.set_value(SettingsKey::ShouldSaveLocation, "yes").unwrap();

		assert!(matches!(
			store.get_value::<bool>(SettingsKey::ShouldSaveLocation),
			Err(SettingsError::Decode { key: "should_save_location", .. })
		));
	}

	#[test]
	fn file_store_persists_across_opens() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("settings").join("settings.json");

		let store = JsonFileSettingsStore::open(&path).unwrap();
		store.set("opaque", vec![0, 159, 146, 150]).unwrap();
		store.set_value(SettingsKey::ShouldSaveLocation, &true).unwrap();
		store.set("removed", vec![1]).unwrap();
		store.remove("removed").unwrap();

		let reopened = JsonFileSettingsStore::open(&path).unwrap();
		assert_eq!(reopened.get("opaque"), Some(vec![0, 159, 146, 150]));
		assert_eq!(
			reopened
				.get_value::<bool>(SettingsKey::ShouldSaveLocation)
				.unwrap(),
			Some(true)
		);
		assert_eq!(reopened.get("removed"), None);
	}

	#[test]
	fn failed_writes_leave_values_unchanged() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("settings").join("settings.json");

		let store = JsonFileSettingsStore::open(&path).unwrap();
		store.set("kept", vec![1]).unwrap();

		// The settings folder turns into a file, so nothing more can be written.
		fs::remove_dir_all(dir.path().join("settings")).unwrap();
		fs::write(dir.path().join("settings"), "not a folder").unwrap();

		assert!(store.set("lost", vec![2]).is_err());
		assert!(store.remove("kept").is_err());

		assert_eq!(store.get("lost"), None);
		assert_eq!(store.get("kept"), Some(vec![1]));
	}

	#[test]
	fn corrupt_file_is_reported() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("settings.json");
		fs::write(&path, "{\"opaque\": \"not base64!\"}").unwrap();

		assert!(matches!(
			JsonFileSettingsStore::open(&path),
			Err(SettingsError::Corrupt { .. })
		));
	}
}
