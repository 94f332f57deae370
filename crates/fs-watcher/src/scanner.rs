use std::path::{Path, PathBuf};

use async_channel as chan;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::{
	select, spawn,
	sync::oneshot,
	task::{spawn_blocking, JoinError, JoinHandle},
};
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

use crate::{
	Changes, DirectorySnapshotter, FileDetails, FsEvent, Identifier, ScannerError, ScannerState,
};

/// Receives the scanner's change batches. All calls happen on the scanner worker, one at a time,
/// and never after [`DirectoryScanner::stop`] returns.
pub trait ScannerHandler: Send + 'static {
	fn on_file_creation(&mut self, files: &[FileDetails]);

	fn on_file_update(&mut self, files: &[FileDetails]);

	fn on_file_deletion(&mut self, identifiers: &[Identifier]);

	/// The startup reconciliation has been delivered.
	fn on_start(&mut self) {}
}

impl<H: ScannerHandler + ?Sized> ScannerHandler for Box<H> {
	fn on_file_creation(&mut self, files: &[FileDetails]) {
		(**self).on_file_creation(files);
	}

	fn on_file_update(&mut self, files: &[FileDetails]) {
		(**self).on_file_update(files);
	}

	fn on_file_deletion(&mut self, identifiers: &[Identifier]) {
		(**self).on_file_deletion(identifiers);
	}

	fn on_start(&mut self) {
		(**self).on_start();
	}
}

type Callback<T> = Box<dyn FnMut(&[T]) + Send>;

/// A [`ScannerHandler`] assembled from closures; unset callbacks ignore their batches.
#[derive(Default)]
pub struct ScannerCallbacks {
	on_creation: Option<Callback<FileDetails>>,
	on_update: Option<Callback<FileDetails>>,
	on_deletion: Option<Callback<Identifier>>,
	on_start: Option<Box<dyn FnMut() + Send>>,
}

impl ScannerCallbacks {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_creation(mut self, callback: impl FnMut(&[FileDetails]) + Send + 'static) -> Self {
		self.on_creation = Some(Box::new(callback));
		self
	}

	#[must_use]
	pub fn with_update(mut self, callback: impl FnMut(&[FileDetails]) + Send + 'static) -> Self {
		self.on_update = Some(Box::new(callback));
		self
	}

	#[must_use]
	pub fn with_deletion(mut self, callback: impl FnMut(&[Identifier]) + Send + 'static) -> Self {
		self.on_deletion = Some(Box::new(callback));
		self
	}

	#[must_use]
	pub fn with_start(mut self, callback: impl FnMut() + Send + 'static) -> Self {
		self.on_start = Some(Box::new(callback));
		self
	}
}

impl ScannerHandler for ScannerCallbacks {
	fn on_file_creation(&mut self, files: &[FileDetails]) {
		if let Some(callback) = &mut self.on_creation {
			callback(files);
		}
	}

	fn on_file_update(&mut self, files: &[FileDetails]) {
		if let Some(callback) = &mut self.on_update {
			callback(files);
		}
	}

	fn on_file_deletion(&mut self, identifiers: &[Identifier]) {
		if let Some(callback) = &mut self.on_deletion {
			callback(identifiers);
		}
	}

	fn on_start(&mut self) {
		if let Some(callback) = &mut self.on_start {
			callback();
		}
	}
}

impl Changes {
	/// Hands the batches to `handler` as deletions, creations, then updates, skipping empty ones.
	pub fn dispatch<H: ScannerHandler + ?Sized>(self, handler: &mut H) {
		if !self.deleted.is_empty() {
			handler.on_file_deletion(&self.deleted);
		}
		if !self.created.is_empty() {
			handler.on_file_creation(&self.created);
		}
		if !self.updated.is_empty() {
			handler.on_file_update(&self.updated);
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerStatus {
	Stopped,
	Starting,
	Running,
}

struct Worker {
	watcher: RecommendedWatcher,
	stop_tx: chan::Sender<()>,
	handle: JoinHandle<()>,
}

/// Watches one root folder and keeps a [`ScannerHandler`] in sync with it.
///
/// Startup reconciles a caller-provided snapshot against a fresh walk, after which live
/// notifications are folded in incrementally. The watch is registered before the walk, so
/// anything changing during the walk shows up either in the walk or as a later event; the
/// state machine absorbs the overlap.
pub struct DirectoryScanner {
	root: PathBuf,
	status: ScannerStatus,
	worker: Option<Worker>,
}

impl DirectoryScanner {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			status: ScannerStatus::Stopped,
			worker: None,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn status(&self) -> ScannerStatus {
		self.status
	}

	/// Resolves once the startup reconciliation has been delivered to `handler`.
	///
	/// On failure the scanner is back to [`ScannerStatus::Stopped`] with nothing left watching.
	#[instrument(
		name = "directory_scanner_start",
		skip_all,
		fields(root = %self.root.display(), snapshot_len = snapshot.len()),
	)]
	pub async fn start(
		&mut self,
		snapshot: Vec<FileDetails>,
		handler: impl ScannerHandler,
	) -> Result<(), ScannerError> {
		if self.status != ScannerStatus::Stopped {
			return Err(ScannerError::AlreadyStarted);
		}
		self.status = ScannerStatus::Starting;

		let (watcher, events_rx) = match watch(&self.root) {
			Ok(watching) => watching,
			Err(e) => {
				self.status = ScannerStatus::Stopped;
				return Err(e);
			}
		};

		let (stop_tx, stop_rx) = chan::bounded(1);
		let (started_tx, started_rx) = oneshot::channel();

		let handle = spawn(
			run(
				ScannerState::new(&self.root),
				snapshot,
				handler,
				events_rx,
				stop_rx,
				started_tx,
			)
			.in_current_span(),
		);

		// Stored before awaiting so a dropped `start` future still leaves something to stop.
		self.worker = Some(Worker {
			watcher,
			stop_tx,
			handle,
		});

		match started_rx.await {
			Ok(Ok(())) => {
				self.status = ScannerStatus::Running;
				info!("Directory scanner running;");
				Ok(())
			}
			Ok(Err(e)) => {
				error!(?e, "Directory scanner failed to start;");
				self.stop().await;
				Err(e)
			}
			Err(_) => {
				// The worker died before reporting back.
				self.status = ScannerStatus::Stopped;
				let Some(Worker { handle, .. }) = self.worker.take() else {
					return Err(ScannerError::Interrupted);
				};
				match handle.await {
					Err(e) => Err(e.into()),
					Ok(()) => Err(ScannerError::Interrupted),
				}
			}
		}
	}

	/// Stops watching and waits for the worker to exit. No handler call happens after this
	/// returns. Stopping a stopped scanner does nothing.
	#[instrument(name = "directory_scanner_stop", skip_all, fields(root = %self.root.display()))]
	pub async fn stop(&mut self) {
		self.status = ScannerStatus::Stopped;

		let Some(Worker {
			watcher,
			stop_tx,
			handle,
		}) = self.worker.take()
		else {
			return;
		};

		// Dropping the watcher closes the events channel, so nothing new gets queued.
		drop(watcher);

		if stop_tx.send(()).await.is_err() {
			trace!("Directory scanner worker already exited;");
		}

		if let Err(e) = handle.await {
			error!(?e, "Failed to join directory scanner worker;");
		}

		info!("Directory scanner stopped;");
	}
}

impl Drop for DirectoryScanner {
	fn drop(&mut self) {
		if let Some(Worker { handle, .. }) = self.worker.take() {
			handle.abort();
		}
	}
}

type EventsReceiver = chan::Receiver<notify::Result<Event>>;

fn watch(root: &Path) -> Result<(RecommendedWatcher, EventsReceiver), ScannerError> {
	let (events_tx, events_rx) = chan::unbounded();

	let mut watcher = RecommendedWatcher::new(
		move |result| {
			if !events_tx.is_closed() {
				// SAFETY: we are not blocking the thread as this is an unbounded channel
				if events_tx.send_blocking(result).is_err() {
					error!("Unable to send file system event to directory scanner;");
				}
			} else {
				trace!("Dropping file system event for a stopped directory scanner;");
			}
		},
		Config::default(),
	)?;

	watcher.watch(root, RecursiveMode::Recursive)?;
	trace!(root = %root.display(), "Now watching root;");

	Ok((watcher, events_rx))
}

async fn run<H: ScannerHandler>(
	mut state: ScannerState,
	snapshot: Vec<FileDetails>,
	mut handler: H,
	events_rx: EventsReceiver,
	stop_rx: chan::Receiver<()>,
	started_tx: oneshot::Sender<Result<(), ScannerError>>,
) {
	let walk = spawn_blocking({
		let root = state.root().to_path_buf();
		move || DirectorySnapshotter::for_root(root).snapshot()
	});

	let walked = select! {
		biased;

		_ = stop_rx.recv() => Err(ScannerError::Interrupted),

		res = walk => match res {
			Ok(Ok(files)) => Ok(files),
			Ok(Err(e)) => Err(e.into()),
			Err(e) => Err(e.into()),
		},
	};

	let current = match walked {
		Ok(current) => current,
		Err(e) => {
			if started_tx.send(Err(e)).is_err() {
				trace!("Nobody waiting on directory scanner startup;");
			}
			return;
		}
	};

	let reconciled = on_blocking_pool(state, handler, move |state, handler| {
		state.reconcile(snapshot, current).dispatch(handler);
		handler.on_start();
	})
	.await;

	(state, handler) = match reconciled {
		Ok(worker) => worker,
		Err(e) => {
			if started_tx.send(Err(e.into())).is_err() {
				trace!("Nobody waiting on directory scanner startup;");
			}
			return;
		}
	};

	if started_tx.send(Ok(())).is_err() {
		trace!("Nobody waiting on directory scanner startup;");
	}

	loop {
		select! {
			biased;

			_ = stop_rx.recv() => {
				debug!("Stopping directory scanner worker;");
				break;
			}

			event = events_rx.recv() => match event {
				Ok(Ok(event)) => {
					let handled = on_blocking_pool(state, handler, move |state, handler| {
						handle_event(state, event, handler);
					})
					.await;

					match handled {
						Ok(worker) => (state, handler) = worker,
						Err(e) => {
							error!(?e, "Directory scanner event handling panicked, stopping;");
							break;
						}
					}
				}
				Ok(Err(e)) => error!(?e, "Watcher error;"),
				Err(_) => {
					debug!("File system events channel closed;");
					break;
				}
			},
		}
	}
}

/// Runs `f` on the blocking pool, handing the worker's state and handler over and back.
/// Metadata lookups, subtree walks and handler file reads all happen in there.
async fn on_blocking_pool<H: ScannerHandler>(
	mut state: ScannerState,
	mut handler: H,
	f: impl FnOnce(&mut ScannerState, &mut H) + Send + 'static,
) -> Result<(ScannerState, H), JoinError> {
	spawn_blocking(move || {
		f(&mut state, &mut handler);
		(state, handler)
	})
	.await
}

fn handle_event(state: &mut ScannerState, event: Event, handler: &mut impl ScannerHandler) {
	for event in FsEvent::from_notify(event) {
		match state.apply(&event) {
			Ok(changes) => {
				if !changes.is_empty() {
					trace!(?event, changes = changes.len(), "Applied file system event;");
				}
				changes.dispatch(handler);
			}
			Err(e) => warn!(?e, ?event, "Failed to resolve file system event, dropping it;"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{Arc, Mutex};

	use pretty_assertions::assert_eq;

	use super::*;

	#[derive(Debug, PartialEq, Eq)]
	enum Call {
		Start,
		Created(usize),
		Updated(usize),
		Deleted(usize),
	}

	fn recorder() -> (ScannerCallbacks, Arc<Mutex<Vec<Call>>>) {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let callbacks = ScannerCallbacks::new()
			.with_creation({
				let calls = Arc::clone(&calls);
				move |files| calls.lock().unwrap().push(Call::Created(files.len()))
			})
			.with_update({
				let calls = Arc::clone(&calls);
				move |files| calls.lock().unwrap().push(Call::Updated(files.len()))
			})
			.with_deletion({
				let calls = Arc::clone(&calls);
				move |identifiers| calls.lock().unwrap().push(Call::Deleted(identifiers.len()))
			})
			.with_start({
				let calls = Arc::clone(&calls);
				move || calls.lock().unwrap().push(Call::Start)
			});
		(callbacks, calls)
	}

	#[test]
	fn dispatch_orders_batches_and_skips_empty_ones() {
		let (mut callbacks, calls) = recorder();

		Changes {
			created: vec![FileDetails::new("/notes", "/notes/a.md", false, 1)],
			updated: vec![
				FileDetails::new("/notes", "/notes/b.md", false, 2),
				FileDetails::new("/notes", "/notes/c.md", false, 3),
			],
			deleted: vec![Identifier::new("/notes", "/notes/d.md")],
		}
		.dispatch(&mut callbacks);

		Changes::updated(vec![FileDetails::new("/notes", "/notes/e.md", false, 4)])
			.dispatch(&mut callbacks);

		Changes::default().dispatch(&mut callbacks);
		callbacks.on_start();

		assert_eq!(
			*calls.lock().unwrap(),
			vec![
				Call::Deleted(1),
				Call::Created(1),
				Call::Updated(2),
				Call::Updated(1),
				Call::Start,
			]
		);
	}

	#[test]
	fn unset_callbacks_are_ignored() {
		let mut callbacks = ScannerCallbacks::new();
		callbacks.on_file_creation(&[FileDetails::new("/notes", "/notes/a.md", false, 1)]);
		callbacks.on_file_deletion(&[]);
		callbacks.on_start();
	}
}
