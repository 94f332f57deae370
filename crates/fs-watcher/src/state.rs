use std::{
	collections::HashMap,
	io,
	path::{Component, Path, PathBuf},
};

use thoughts_utils::{is_hidden_name, FileIOError};
use tracing::{debug, trace};

use crate::{
	DirectorySnapshotter, FileDetails, FsEvent, FsEventKind, Identifier, ItemType, ScannerError,
};

/// One batch worth of index changes, delivered as deletions, then creations, then updates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Changes {
	pub created: Vec<FileDetails>,
	pub updated: Vec<FileDetails>,
	pub deleted: Vec<Identifier>,
}

impl Changes {
	pub fn created(created: Vec<FileDetails>) -> Self {
		Self {
			created,
			..Default::default()
		}
	}

	pub fn updated(updated: Vec<FileDetails>) -> Self {
		Self {
			updated,
			..Default::default()
		}
	}

	pub fn deleted(deleted: Vec<Identifier>) -> Self {
		Self {
			deleted,
			..Default::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
	}

	pub fn len(&self) -> usize {
		self.created.len() + self.updated.len() + self.deleted.len()
	}

	fn extend(&mut self, other: Self) {
		self.created.extend(other.created);
		self.updated.extend(other.updated);
		self.deleted.extend(other.deleted);
	}
}

/// The scanner's view of its root: identifier to the latest known details.
///
/// Only the scanner worker owns one of these while running. Kept free of any async machinery
/// so the reconciliation rules can be exercised directly.
#[derive(Debug, Clone)]
pub struct ScannerState {
	root: PathBuf,
	files: HashMap<Identifier, FileDetails>,
}

impl ScannerState {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			files: HashMap::new(),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn identifier(&self, path: impl Into<PathBuf>) -> Identifier {
		Identifier::new(&self.root, path)
	}

	pub fn get(&self, identifier: &Identifier) -> Option<&FileDetails> {
		self.files.get(identifier)
	}

	pub fn contains(&self, identifier: &Identifier) -> bool {
		self.files.contains_key(identifier)
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	/// Current table contents, suitable as the prior snapshot of a later reconciliation.
	pub fn snapshot(&self) -> Vec<FileDetails> {
		self.files.values().cloned().collect()
	}

	/// Replaces the table with `current`, reporting how it differs from `prior`.
	///
	/// Entries only in `prior` are deleted, entries only in `current` created, and entries in
	/// both updated when they are no longer equivalent. Unchanged entries are carried forward
	/// with their original uuid.
	pub fn reconcile(
		&mut self,
		prior: impl IntoIterator<Item = FileDetails>,
		current: impl IntoIterator<Item = FileDetails>,
	) -> Changes {
		let prior = prior
			.into_iter()
			.map(|details| (details.identifier.clone(), details))
			.collect();

		let (changes, files) = diff(prior, current);
		self.files = files;

		debug!(
			root = %self.root.display(),
			files = self.files.len(),
			created = changes.created.len(),
			updated = changes.updated.len(),
			deleted = changes.deleted.len(),
			"Reconciled snapshot;"
		);

		changes
	}

	/// Folds one live event into the table.
	///
	/// Errors mean the event's path could not be resolved; the table is left untouched.
	pub fn apply(&mut self, event: &FsEvent) -> Result<Changes, ScannerError> {
		if !self.is_visible(&event.path) {
			trace!(path = %event.path.display(), "Ignoring event outside root or on hidden path;");
			return Ok(Changes::default());
		}

		match event.kind {
			FsEventKind::Created => self.created(&event.path),
			FsEventKind::Removed => Ok(self.removed(&event.path, event.item_type)),
			FsEventKind::Renamed => self.renamed(&event.path, event.item_type),
			FsEventKind::Modified | FsEventKind::MetadataChanged => self.modified(&event.path),
			FsEventKind::Other => {
				trace!(?event, "Dropping ignorable event;");
				Ok(Changes::default())
			}
		}
	}

	fn created(&mut self, path: &Path) -> Result<Changes, ScannerError> {
		let details = FileDetails::from_path(path, &self.root)?;

		// Creations already captured by the startup walk are reported again when notifications
		// race the walk.
		if self.files.contains_key(&details.identifier) {
			trace!(path = %path.display(), "Suppressing duplicate creation;");
			return Ok(Changes::default());
		}

		self.insert_new(details)
	}

	fn removed(&mut self, path: &Path, item_type: ItemType) -> Changes {
		let identifier = self.identifier(path);

		let was_directory = self
			.files
			.get(&identifier)
			.map_or(item_type == ItemType::Directory, |details| details.is_directory);

		let mut deleted = Vec::new();
		self.files.remove(&identifier);
		deleted.push(identifier);

		if was_directory {
			deleted.extend(self.remove_nested(path));
		}

		Changes::deleted(deleted)
	}

	fn renamed(&mut self, path: &Path, item_type: ItemType) -> Result<Changes, ScannerError> {
		// Renames cover additions, removals and atomic replacement alike, so the disk decides.
		let metadata = match std::fs::symlink_metadata(path) {
			Ok(metadata) => metadata,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Ok(self.removed(path, item_type));
			}
			Err(e) => return Err(FileIOError::from((path, e)).into()),
		};

		let details = FileDetails::from_metadata(path, &self.root, &metadata)?;

		let Some(old) = self.files.get(&details.identifier) else {
			return self.insert_new(details);
		};

		// Something was already tracked here, so new content was moved over it.
		let update = old.applying(&details);
		let was_directory = old.is_directory;

		// The subtree goes first: a failed walk must leave the table as it was.
		let mut changes = Changes::updated(vec![update.clone()]);
		if details.is_directory {
			changes.extend(self.refresh_subtree(path)?);
		} else if was_directory {
			changes.deleted.extend(self.remove_nested(path));
		}
		self.files.insert(update.identifier.clone(), update);

		Ok(changes)
	}

	fn modified(&mut self, path: &Path) -> Result<Changes, ScannerError> {
		let details = FileDetails::from_path(path, &self.root)?;

		let Some(old) = self.files.get(&details.identifier) else {
			return self.insert_new(details);
		};

		if old.equivalent(&details) {
			trace!(path = %path.display(), "Metadata unchanged, coalescing modification;");
			return Ok(Changes::default());
		}

		let update = old.applying(&details);
		let lost_children = old.is_directory && !details.is_directory;
		self.files.insert(update.identifier.clone(), update.clone());

		let mut changes = Changes::updated(vec![update]);
		if lost_children {
			changes.deleted.extend(self.remove_nested(path));
		}

		Ok(changes)
	}

	/// Starts tracking an entry we have never seen. Directories bring their whole subtree,
	/// as no notification is sent for the children of a directory that appears at once.
	fn insert_new(&mut self, details: FileDetails) -> Result<Changes, ScannerError> {
		if !details.is_directory {
			self.files
				.insert(details.identifier.clone(), details.clone());
			return Ok(Changes::created(vec![details]));
		}

		let files = DirectorySnapshotter::new(details.path(), &self.root).snapshot()?;
		let created = files
			.into_iter()
			.filter(|file| !self.files.contains_key(&file.identifier))
			.collect::<Vec<_>>();

		for file in &created {
			self.files.insert(file.identifier.clone(), file.clone());
		}

		Ok(Changes::created(created))
	}

	/// Re-walks the children of a tracked directory whose contents were swapped out.
	fn refresh_subtree(&mut self, directory: &Path) -> Result<Changes, ScannerError> {
		let current = DirectorySnapshotter::new(directory, &self.root)
			.snapshot()?
			.into_iter()
			.filter(|file| file.path() != directory)
			.collect::<Vec<_>>();

		let nested = self
			.files
			.keys()
			.filter(|identifier| identifier.is_nested_under(directory))
			.cloned()
			.collect::<Vec<_>>();
		let prior = nested
			.into_iter()
			.filter_map(|identifier| {
				self.files
					.remove(&identifier)
					.map(|details| (identifier, details))
			})
			.collect();

		let (changes, files) = diff(prior, current);
		self.files.extend(files);

		Ok(changes)
	}

	fn remove_nested(&mut self, directory: &Path) -> Vec<Identifier> {
		let mut nested = self
			.files
			.keys()
			.filter(|identifier| identifier.is_nested_under(directory))
			.cloned()
			.collect::<Vec<_>>();
		nested.sort();

		for identifier in &nested {
			self.files.remove(identifier);
		}

		nested
	}

	/// Paths outside the root, or with a dotfile component below it, are never tracked.
	fn is_visible(&self, path: &Path) -> bool {
		path.strip_prefix(&self.root).is_ok_and(|relative| {
			!relative.components().any(|component| match component {
				Component::Normal(name) => is_hidden_name(name),
				_ => false,
			})
		})
	}
}

fn diff(
	mut prior: HashMap<Identifier, FileDetails>,
	current: impl IntoIterator<Item = FileDetails>,
) -> (Changes, HashMap<Identifier, FileDetails>) {
	let mut changes = Changes::default();
	let mut files = HashMap::new();

	for details in current {
		let reconciled = match prior.remove(&details.identifier) {
			Some(old) if old.equivalent(&details) => old,
			Some(old) => {
				let update = old.applying(&details);
				changes.updated.push(update.clone());
				update
			}
			None => {
				changes.created.push(details.clone());
				details
			}
		};
		files.insert(reconciled.identifier.clone(), reconciled);
	}

	changes.deleted = prior.into_keys().collect();
	changes.deleted.sort();

	(changes, files)
}
