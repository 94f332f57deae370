use std::{
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use thiserror::Error;
use thoughts_trie::Trie;
use tokio::{
	spawn,
	sync::watch,
	task::{spawn_blocking, JoinHandle},
	time::timeout,
};
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

use crate::{
	document::{Document, Location, SyncOutcome},
	geocoder::{Coordinate, Geocoder},
	library::{LibraryError, TagLibrary},
	root::{RootFolder, RootFolderError},
	settings::{SettingsError, SettingsKey, SettingsStore, SettingsStoreExt},
};

#[derive(Debug, Error)]
pub enum ModelError {
	#[error(transparent)]
	RootFolder(#[from] RootFolderError),
	#[error(transparent)]
	Library(#[from] LibraryError),
	#[error(transparent)]
	Settings(#[from] SettingsError),
}

/// Outcome of the most recent attempt to save the current note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
	Idle,
	Saved(PathBuf),
	Deleted(PathBuf),
	Failed(String),
}

/// The note being composed. A fresh note nobody has edited is never synced, so starting one
/// cannot remove a note saved under the same filename within the same second.
#[derive(Debug, Clone)]
struct Draft {
	document: Document,
	edited: bool,
}

impl Draft {
	fn fresh() -> Self {
		Self {
			document: Document::now(),
			edited: false,
		}
	}
}

/// Ties the notes folder, its tag library and the note being composed together.
///
/// Edits to the note are saved after a quiet period. Nothing the tag library observes feeds back
/// into saving, so a saved note being picked up by the scanner ends there.
pub struct ApplicationModel {
	settings: Arc<dyn SettingsStore>,
	geocoder: Arc<dyn Geocoder>,
	root_tx: watch::Sender<Option<RootFolder>>,
	library: Option<TagLibrary>,
	tags_tx: watch::Sender<Arc<Trie>>,
	document_tx: watch::Sender<Draft>,
	status_tx: watch::Sender<SyncStatus>,
	sync_task: JoinHandle<()>,
	should_save_location: bool,
}

impl ApplicationModel {
	/// Restores the persisted settings and starts the tag library for the saved notes folder.
	///
	/// A saved folder that can no longer be opened is forgotten rather than failing startup.
	pub async fn new(
		settings: Arc<dyn SettingsStore>,
		geocoder: Arc<dyn Geocoder>,
		debounce: Duration,
	) -> Self {
		let root = match settings.get_value::<PathBuf>(SettingsKey::RootFolder) {
			Ok(Some(path)) => RootFolder::new(&path)
				.map_err(|e| warn!(?e, path = %path.display(), "Saved notes folder is unavailable;"))
				.ok(),
			Ok(None) => None,
			Err(e) => {
				warn!(?e, "Failed to read saved notes folder;");
				None
			}
		};

		let should_save_location = settings
			.get_value::<bool>(SettingsKey::ShouldSaveLocation)
			.unwrap_or_else(|e| {
				warn!(?e, "Failed to read location preference;");
				None
			})
			.unwrap_or(false);

		let (root_tx, root_rx) = watch::channel(root);
		let (tags_tx, _) = watch::channel(Arc::new(Trie::default()));
		let (document_tx, document_rx) = watch::channel(Draft::fresh());
		let (status_tx, _) = watch::channel(SyncStatus::Idle);

		let sync_task = spawn(
			sync_documents(document_rx, root_rx, status_tx.clone(), debounce).in_current_span(),
		);

		let mut model = Self {
			settings,
			geocoder,
			root_tx,
			library: None,
			tags_tx,
			document_tx,
			status_tx,
			sync_task,
			should_save_location,
		};

		if let Err(e) = model.reload_library().await {
			error!(?e, "Failed to start tag library;");
		}

		model
	}

	pub fn root_folder(&self) -> Option<RootFolder> {
		self.root_tx.borrow().clone()
	}

	/// Switches to a new notes folder: the current note is saved where it belongs, the folder is
	/// remembered, its tags are loaded and a fresh note is started.
	#[instrument(skip_all, fields(path = %path.as_ref().display()))]
	pub async fn set_root_folder(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
		let root = RootFolder::new(path)?;

		self.flush().await;

		self.settings
			.set_value(SettingsKey::RootFolder, root.path())?;
		self.root_tx.send_replace(Some(root));
		self.document_tx.send_replace(Draft::fresh());

		self.reload_library().await
	}

	/// Replaces the tag library with one for the current notes folder, if any.
	pub async fn reload_library(&mut self) -> Result<(), ModelError> {
		if let Some(mut library) = self.library.take() {
			library.stop().await;
		}

		let Some(root) = self.root_folder() else {
			self.tags_tx.send_if_modified(|tags| {
				if tags.is_empty() {
					return false;
				}
				*tags = Arc::new(Trie::default());
				true
			});
			return Ok(());
		};

		let mut library = TagLibrary::with_publisher(&root, self.tags_tx.clone());
		library.start(Vec::new()).await?;
		self.library = Some(library);

		info!(%root, "Tag library loaded;");

		Ok(())
	}

	pub fn tags(&self) -> Arc<Trie> {
		Arc::clone(&self.tags_tx.borrow())
	}

	/// Follows the tags of whichever notes folder is current.
	pub fn subscribe_tags(&self) -> watch::Receiver<Arc<Trie>> {
		self.tags_tx.subscribe()
	}

	pub fn document(&self) -> Document {
		self.document_tx.borrow().document.clone()
	}

	/// Saves the current note right away and starts a new one.
	pub async fn new_document(&mut self) {
		self.flush().await;
		self.document_tx.send_replace(Draft::fresh());
	}

	/// Edits the current note; the change is saved once edits pause.
	pub fn update_document(&self, edit: impl FnOnce(&mut Document)) {
		self.document_tx.send_modify(|draft| {
			edit(&mut draft.document);
			draft.edited = true;
		});
	}

	/// Records where the current note is written, naming the place when the geocoder can.
	/// Ignored unless saving locations is enabled.
	pub async fn set_location(&self, coordinate: Coordinate) {
		if !self.should_save_location {
			debug!("Location saving is disabled, ignoring location;");
			return;
		}

		let placemark = self.geocoder.resolve(coordinate).await.unwrap_or_default();

		let location = Location {
			latitude: coordinate.latitude,
			longitude: coordinate.longitude,
			name: placemark.name,
			locality: placemark.locality,
		};
		self.update_document(|document| document.location = Some(location));
	}

	pub fn should_save_location(&self) -> bool {
		self.should_save_location
	}

	/// Turning location saving off also strips the location from the current note.
	pub fn set_should_save_location(&mut self, should_save_location: bool) -> Result<(), ModelError> {
		self.settings
			.set_value(SettingsKey::ShouldSaveLocation, &should_save_location)?;
		self.should_save_location = should_save_location;

		if !should_save_location {
			self.document_tx
				.send_if_modified(|draft| draft.document.location.take().is_some());
		}

		Ok(())
	}

	pub fn subscribe_sync_status(&self) -> watch::Receiver<SyncStatus> {
		self.status_tx.subscribe()
	}

	/// Saves any pending edit and stops watching the notes folder.
	#[instrument(skip_all)]
	pub async fn shutdown(self) {
		let Self {
			library,
			document_tx,
			sync_task,
			..
		} = self;

		if let Some(mut library) = library {
			library.stop().await;
		}

		// Closing the channel makes the sync task save what is pending and exit.
		drop(document_tx);
		if let Err(e) = sync_task.await {
			error!(?e, "Failed to join note sync task;");
		}

		info!("Application model shut down;");
	}

	async fn flush(&self) {
		let draft = self.document_tx.borrow().clone();
		if draft.edited {
			sync_document(draft.document, self.root_folder(), &self.status_tx).await;
		}
	}
}

async fn sync_documents(
	mut document_rx: watch::Receiver<Draft>,
	root_rx: watch::Receiver<Option<RootFolder>>,
	status_tx: watch::Sender<SyncStatus>,
	debounce: Duration,
) {
	while document_rx.changed().await.is_ok() {
		let closed = loop {
			match timeout(debounce, document_rx.changed()).await {
				// Another edit within the window: keep waiting.
				Ok(Ok(())) => continue,
				Ok(Err(_)) => break true,
				Err(_) => break false,
			}
		};

		let draft = document_rx.borrow_and_update().clone();
		if draft.edited {
			let root = root_rx.borrow().clone();
			sync_document(draft.document, root, &status_tx).await;
		}

		if closed {
			break;
		}
	}

	trace!("Note sync task finished;");
}

async fn sync_document(
	document: Document,
	root: Option<RootFolder>,
	status_tx: &watch::Sender<SyncStatus>,
) {
	let Some(root) = root else {
		trace!("No notes folder, not saving note;");
		return;
	};

	let status = match spawn_blocking(move || document.sync(&root)).await {
		Ok(Ok(SyncOutcome::Written(path))) => SyncStatus::Saved(path),
		Ok(Ok(SyncOutcome::Deleted(path))) => SyncStatus::Deleted(path),
		Ok(Ok(SyncOutcome::Unchanged)) => return,
		Ok(Ok(SyncOutcome::Skipped)) => SyncStatus::Failed("note could not be encoded".to_string()),
		Ok(Err(e)) => {
			error!(?e, "Failed to save note;");
			SyncStatus::Failed(e.to_string())
		}
		Err(e) => {
			error!(?e, "Note sync task failed;");
			SyncStatus::Failed(e.to_string())
		}
	};

	status_tx.send_replace(status);
}
