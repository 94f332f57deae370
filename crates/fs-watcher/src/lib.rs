//! Folder watching for Thoughts.
//!
//! [`DirectoryScanner`] keeps a [`ScannerHandler`] informed of every entry under a root folder:
//! once at startup, by reconciling a previously persisted snapshot against a fresh walk, and
//! afterwards from live `notify` events. Each change is reported exactly once as part of a
//! creation, update or deletion batch.

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
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod details;
mod error;
mod event;
mod scanner;
mod snapshot;
mod state;

pub use details::{millis_since_epoch, ContentType, FileDetails, Identifier};
pub use error::{ScannerError, SnapshotError};
pub use event::{FsEvent, FsEventKind, ItemType};
pub use scanner::{DirectoryScanner, ScannerCallbacks, ScannerHandler, ScannerStatus};
pub use snapshot::DirectorySnapshotter;
pub use state::{Changes, ScannerState};
