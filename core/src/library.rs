use std::{
	collections::{BTreeSet, HashMap},
	fs,
	path::Path,
	sync::Arc,
};

use thiserror::Error;
use thoughts_fs_watcher::{
	ContentType, DirectoryScanner, FileDetails, Identifier, ScannerError, ScannerHandler,
	ScannerStatus,
};
use thoughts_trie::Trie;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

use crate::{document::frontmatter, RootFolder};

#[derive(Debug, Error)]
pub enum LibraryError {
	#[error("failed to start tag library scanner: {0}")]
	Scanner(#[from] ScannerError),
}

/// Every tag used by the notes under a root folder, kept current as notes change on disk.
///
/// The tag set is published as an immutable [`Trie`] snapshot; a new one is only sent when the
/// set itself changes.
pub struct TagLibrary {
	root: RootFolder,
	scanner: DirectoryScanner,
	tags_tx: watch::Sender<Arc<Trie>>,
}

impl TagLibrary {
	pub fn new(root: &RootFolder) -> Self {
		let (tags_tx, _) = watch::channel(Arc::new(Trie::default()));
		Self::with_publisher(root, tags_tx)
	}

	/// Publishes into an existing channel, so subscribers can outlive this library.
	pub fn with_publisher(root: &RootFolder, tags_tx: watch::Sender<Arc<Trie>>) -> Self {
		Self {
			root: root.clone(),
			scanner: DirectoryScanner::new(root.path()),
			tags_tx,
		}
	}

	pub fn root(&self) -> &RootFolder {
		&self.root
	}

	pub fn status(&self) -> ScannerStatus {
		self.scanner.status()
	}

	/// Scans the root folder, resolving once the tags of every existing note are known.
	#[instrument(name = "tag_library_start", skip_all, fields(root = %self.root))]
	pub async fn start(&mut self, snapshot: Vec<FileDetails>) -> Result<(), LibraryError> {
		self.scanner
			.start(snapshot, TagIndex::new(self.tags_tx.clone()))
			.await?;

		info!(tags = self.tags_tx.borrow().len(), "Tag library started;");

		Ok(())
	}

	#[instrument(name = "tag_library_stop", skip_all, fields(root = %self.root))]
	pub async fn stop(&mut self) {
		self.scanner.stop().await;
	}

	/// The current tag set.
	pub fn tags(&self) -> Arc<Trie> {
		Arc::clone(&self.tags_tx.borrow())
	}

	/// Notified every time the tag set changes.
	pub fn subscribe(&self) -> watch::Receiver<Arc<Trie>> {
		self.tags_tx.subscribe()
	}
}

/// Per-note tags, maintained from scanner batches on the scanner worker.
struct TagIndex {
	files: HashMap<Identifier, Vec<String>>,
	published: BTreeSet<String>,
	tags_tx: watch::Sender<Arc<Trie>>,
}

impl TagIndex {
	fn new(tags_tx: watch::Sender<Arc<Trie>>) -> Self {
		// Start from whatever a previous run published so restarts only notify on real changes.
		let published = tags_tx.borrow().words_with_prefix("").into_iter().collect();

		Self {
			files: HashMap::new(),
			published,
			tags_tx,
		}
	}

	fn index(&mut self, files: &[FileDetails]) {
		for details in files {
			if details.content_type == ContentType::Markdown {
				self.files
					.insert(details.identifier.clone(), read_tags(details.path()));
			} else if self.files.remove(&details.identifier).is_some() {
				trace!(path = %details.path().display(), "Entry is no longer a note;");
			}
		}
	}

	fn publish(&mut self) {
		let tags = self
			.files
			.values()
			.flatten()
			.cloned()
			.collect::<BTreeSet<_>>();

		let published = &mut self.published;
		let changed = self.tags_tx.send_if_modified(|trie| {
			if *published == tags {
				return false;
			}
			*trie = Arc::new(tags.iter().collect());
			*published = tags;
			true
		});

		if changed {
			debug!(
				notes = self.files.len(),
				tags = self.published.len(),
				"Published new tag set;"
			);
		}
	}
}

impl ScannerHandler for TagIndex {
	fn on_file_creation(&mut self, files: &[FileDetails]) {
		self.index(files);
		self.publish();
	}

	fn on_file_update(&mut self, files: &[FileDetails]) {
		self.index(files);
		self.publish();
	}

	fn on_file_deletion(&mut self, identifiers: &[Identifier]) {
		for identifier in identifiers {
			self.files.remove(identifier);
		}
		self.publish();
	}

	fn on_start(&mut self) {
		// An empty folder delivers no batches but may still clear a previous run's tags.
		self.publish();
	}
}

fn read_tags(path: &Path) -> Vec<String> {
	let text = match fs::read_to_string(path) {
		Ok(text) => text,
		Err(e) => {
			warn!(?e, path = %path.display(), "Failed to read note, treating it as untagged;");
			return Vec::new();
		}
	};

	frontmatter::extract_tags(&text).unwrap_or_else(|e| {
		warn!(?e, path = %path.display(), "Malformed note frontmatter, treating it as untagged;");
		Vec::new()
	})
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tempfile::tempdir;

	use super::*;

	fn sorted(trie: &Trie) -> Vec<String> {
		let mut words = trie.words_with_prefix("");
		words.sort();
		words
	}

	fn note(root: &Path, name: &str, tags: &str) -> FileDetails {
		let path = root.join(name);
		fs::write(&path, format!("---\ntags: [{tags}]\n---\n\nbody")).unwrap();
		FileDetails::from_path(&path, root).unwrap()
	}

	#[test]
	fn unions_tags_across_notes_and_forgets_deleted_ones() {
		let root = tempdir().unwrap();
		let (tags_tx, mut tags_rx) = watch::channel(Arc::new(Trie::default()));
		let mut index = TagIndex::new(tags_tx);

		let a = note(root.path(), "a.md", "travel, food");
		let b = note(root.path(), "b.md", "food, ideas");
		index.on_file_creation(&[a.clone(), b]);

		assert!(tags_rx.has_changed().unwrap());
		assert_eq!(
			sorted(&tags_rx.borrow_and_update()),
			vec!["food", "ideas", "travel"]
		);

		index.on_file_deletion(&[a.identifier]);
		assert_eq!(sorted(&tags_rx.borrow_and_update()), vec!["food", "ideas"]);
	}

	#[test]
	fn unchanged_tag_sets_are_not_republished() {
		let root = tempdir().unwrap();
		let (tags_tx, mut tags_rx) = watch::channel(Arc::new(Trie::default()));
		let mut index = TagIndex::new(tags_tx);

		index.on_file_creation(&[note(root.path(), "a.md", "travel")]);
		tags_rx.borrow_and_update();

		// Same tags under another note, and a rewrite of the first one.
		index.on_file_creation(&[note(root.path(), "b.md", "travel")]);
		index.on_file_update(&[note(root.path(), "a.md", "travel")]);
		index.on_start();

		assert!(!tags_rx.has_changed().unwrap());
	}

	#[test]
	fn ignores_other_files_and_drops_notes_that_stop_being_markdown() {
		let root = tempdir().unwrap();
		let (tags_tx, tags_rx) = watch::channel(Arc::new(Trie::default()));
		let mut index = TagIndex::new(tags_tx);

		fs::write(root.path().join("a.txt"), "---\ntags: [hidden]\n---\n").unwrap();
		let text = FileDetails::from_path(root.path().join("a.txt"), root.path()).unwrap();
		let markdown = note(root.path(), "a.md", "travel");
		index.on_file_creation(&[text, markdown.clone()]);
		assert_eq!(sorted(&tags_rx.borrow()), vec!["travel"]);

		let retyped = FileDetails {
			content_type: ContentType::Other,
			..markdown.clone()
		};
		index.on_file_update(&[markdown.applying(&retyped)]);
		assert!(tags_rx.borrow().is_empty());
	}

	#[test]
	fn unreadable_or_malformed_notes_have_no_tags() {
		let root = tempdir().unwrap();
		let (tags_tx, tags_rx) = watch::channel(Arc::new(Trie::default()));
		let mut index = TagIndex::new(tags_tx);

		fs::write(root.path().join("broken.md"), "---\ntags: [a\n---\n").unwrap();
		let broken = FileDetails::from_path(root.path().join("broken.md"), root.path()).unwrap();
		let vanished = FileDetails::new(root.path(), root.path().join("gone.md"), false, 0);
		let good = note(root.path(), "good.md", "kept");

		index.on_file_creation(&[broken, vanished, good]);

		assert_eq!(sorted(&tags_rx.borrow()), vec!["kept"]);
	}

	#[test]
	fn restart_starts_from_the_published_set() {
		let (tags_tx, mut tags_rx) = watch::channel(Arc::new(Trie::new(["a", "b"])));
		tags_rx.borrow_and_update();

		let mut index = TagIndex::new(tags_tx.clone());
		index.on_start();
		assert!(tags_rx.has_changed().unwrap());
		assert!(tags_rx.borrow_and_update().is_empty());

		let mut index = TagIndex::new(tags_tx);
		index.on_start();
		assert!(!tags_rx.has_changed().unwrap());
	}
}
