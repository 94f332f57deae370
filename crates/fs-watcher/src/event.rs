//! Normalization of raw notify events.
//!
//! Backends disagree on how they report the same operation, so everything is folded into one
//! [`FsEvent`] per affected path carrying only the semantic kinds the scanner acts on.
//!
//! Renames are the awkward case: inotify reports `From`, `To` *and* a combined `Both` for a
//! single move, FSEvents reports an `Any` for each side, and ReadDirectoryChangesW reports
//! `From` then `To`. We keep the per-side events and drop `Both`, so every backend yields one
//! renamed event per path involved.

use std::path::PathBuf;

use notify::{
	event::{AccessKind, AccessMode, CreateKind, MetadataKind, ModifyKind, RemoveKind, RenameMode},
	EventKind,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsEventKind {
	Created,
	Removed,
	/// Either side of a rename; whether it adds or removes an entry is only known by looking
	/// at the disk.
	Renamed,
	Modified,
	MetadataChanged,
	/// Noise without meaning for the index (access, ownership, extended attributes, ...).
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
	File,
	Directory,
	Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEvent {
	pub kind: FsEventKind,
	pub path: PathBuf,
	pub item_type: ItemType,
	/// Opaque backend id tying related events together, when the backend provides one.
	pub tracker: Option<usize>,
}

impl FsEvent {
	pub fn new(kind: FsEventKind, path: impl Into<PathBuf>, item_type: ItemType) -> Self {
		Self {
			kind,
			path: path.into(),
			item_type,
			tracker: None,
		}
	}

	pub fn created(path: impl Into<PathBuf>, item_type: ItemType) -> Self {
		Self::new(FsEventKind::Created, path, item_type)
	}

	pub fn removed(path: impl Into<PathBuf>, item_type: ItemType) -> Self {
		Self::new(FsEventKind::Removed, path, item_type)
	}

	pub fn renamed(path: impl Into<PathBuf>, item_type: ItemType) -> Self {
		Self::new(FsEventKind::Renamed, path, item_type)
	}

	pub fn modified(path: impl Into<PathBuf>) -> Self {
		Self::new(FsEventKind::Modified, path, ItemType::Unknown)
	}

	pub fn metadata_changed(path: impl Into<PathBuf>) -> Self {
		Self::new(FsEventKind::MetadataChanged, path, ItemType::Unknown)
	}

	/// Splits a notify event into one normalized event per path.
	pub fn from_notify(event: notify::Event) -> Vec<Self> {
		let tracker = event.tracker();
		let (kind, item_type) = classify(event.kind);

		event
			.paths
			.into_iter()
			.map(|path| Self {
				kind,
				path,
				item_type,
				tracker,
			})
			.collect()
	}
}

fn classify(kind: EventKind) -> (FsEventKind, ItemType) {
	match kind {
		EventKind::Create(kind) => (
			FsEventKind::Created,
			match kind {
				CreateKind::File => ItemType::File,
				CreateKind::Folder => ItemType::Directory,
				_ => ItemType::Unknown,
			},
		),
		EventKind::Remove(kind) => (
			FsEventKind::Removed,
			match kind {
				RemoveKind::File => ItemType::File,
				RemoveKind::Folder => ItemType::Directory,
				_ => ItemType::Unknown,
			},
		),
		EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
			(FsEventKind::Other, ItemType::Unknown)
		}
		EventKind::Modify(ModifyKind::Name(_)) => (FsEventKind::Renamed, ItemType::Unknown),
		EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
		| EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
			(FsEventKind::Modified, ItemType::Unknown)
		}
		EventKind::Modify(ModifyKind::Metadata(
			MetadataKind::Ownership | MetadataKind::Extended,
		)) => (FsEventKind::Other, ItemType::Unknown),
		EventKind::Modify(ModifyKind::Metadata(_)) => {
			(FsEventKind::MetadataChanged, ItemType::Unknown)
		}
		_ => (FsEventKind::Other, ItemType::Unknown),
	}
}

#[cfg(test)]
mod tests {
	use notify::event::DataChange;
	use pretty_assertions::assert_eq;

	use super::*;

	fn normalize(kind: EventKind, paths: &[&str]) -> Vec<FsEvent> {
		let mut event = notify::Event::new(kind);
		for path in paths {
			event = event.add_path(PathBuf::from(path));
		}
		FsEvent::from_notify(event)
	}

	#[test]
	fn create_and_remove_keep_item_type() {
		assert_eq!(
			normalize(EventKind::Create(CreateKind::Folder), &["/notes/journal"]),
			vec![FsEvent::created("/notes/journal", ItemType::Directory)]
		);
		assert_eq!(
			normalize(EventKind::Remove(RemoveKind::File), &["/notes/a.md"]),
			vec![FsEvent::removed("/notes/a.md", ItemType::File)]
		);
		assert_eq!(
			normalize(EventKind::Remove(RemoveKind::Any), &["/notes/a.md"]),
			vec![FsEvent::removed("/notes/a.md", ItemType::Unknown)]
		);
	}

	#[test]
	fn rename_sides_are_kept_and_combined_event_dropped() {
		assert_eq!(
			normalize(
				EventKind::Modify(ModifyKind::Name(RenameMode::From)),
				&["/notes/a.md"]
			),
			vec![FsEvent::renamed("/notes/a.md", ItemType::Unknown)]
		);
		assert_eq!(
			normalize(
				EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
				&["/notes/b.md"]
			),
			vec![FsEvent::renamed("/notes/b.md", ItemType::Unknown)]
		);

		let both = normalize(
			EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
			&["/notes/a.md", "/notes/b.md"],
		);
		assert_eq!(both.len(), 2);
		assert!(both.iter().all(|event| event.kind == FsEventKind::Other));
	}

	#[test]
	fn content_changes_are_modifications() {
		for kind in [
			EventKind::Modify(ModifyKind::Data(DataChange::Content)),
			EventKind::Modify(ModifyKind::Any),
			EventKind::Access(AccessKind::Close(AccessMode::Write)),
		] {
			assert_eq!(
				normalize(kind, &["/notes/a.md"]),
				vec![FsEvent::modified("/notes/a.md")],
				"{kind:?}"
			);
		}
	}

	#[test]
	fn metadata_noise_is_ignorable() {
		assert_eq!(
			normalize(
				EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
				&["/notes/a.md"]
			),
			vec![FsEvent::metadata_changed("/notes/a.md")]
		);

		for kind in [
			EventKind::Modify(ModifyKind::Metadata(MetadataKind::Ownership)),
			EventKind::Modify(ModifyKind::Metadata(MetadataKind::Extended)),
			EventKind::Access(AccessKind::Read),
			EventKind::Any,
		] {
			let events = normalize(kind, &["/notes/a.md"]);
			assert_eq!(events[0].kind, FsEventKind::Other, "{kind:?}");
		}
	}
}
