//! Thoughts application core.
//!
//! Notes are Markdown files with YAML frontmatter in a user chosen folder. The [`TagLibrary`]
//! keeps the set of tags used across that folder current for autocompletion, while the
//! [`ApplicationModel`] holds the note being composed and saves it as the user types.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro,
	deprecated
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod config;
pub mod document;
mod fs;
pub mod geocoder;
pub mod library;
pub mod model;
pub mod root;
pub mod settings;

pub use config::{default_data_dir, AppConfig};
pub use document::{Document, DocumentError, Location, RegionalDate, SyncOutcome};
pub use geocoder::{Coordinate, Geocoder, NoopGeocoder, Placemark};
pub use library::{LibraryError, TagLibrary};
pub use model::{ApplicationModel, ModelError, SyncStatus};
pub use root::{RootFolder, RootFolderError};
pub use settings::{
	JsonFileSettingsStore, MemorySettingsStore, SettingsError, SettingsKey, SettingsStore,
	SettingsStoreExt,
};

pub use thoughts_fs_watcher::FileDetails;
pub use thoughts_trie::Trie;
