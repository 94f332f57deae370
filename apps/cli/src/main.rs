use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use thoughts_core::{
	AppConfig, ApplicationModel, Coordinate, Document, JsonFileSettingsStore, NoopGeocoder,
	RootFolder, SyncStatus, Trie,
};
use tracing::{info, warn};

mod logging;

#[derive(Parser, Debug)]
#[command(name = "thoughts", about = "Write notes into a folder and browse their tags")]
struct Cli {
	/// Path to thoughts data directory
	#[arg(long)]
	data_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Show the notes folder, or switch to another one
	Root { path: Option<PathBuf> },
	/// List known tags, optionally only those starting with a prefix
	Tags { prefix: Option<String> },
	/// Print the tag set every time it changes, until interrupted
	Watch,
	/// Choose whether notes record where they were written
	Location {
		#[arg(value_enum)]
		state: Toggle,
	},
	/// Write a new note
	Note(NoteArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
	On,
	Off,
}

#[derive(Parser, Debug, Clone)]
struct NoteArgs {
	/// Note text
	#[arg(required = true)]
	pub body: Vec<String>,

	/// Whitespace separated tags
	#[arg(long)]
	pub tags: Option<String>,

	/// Latitude of the place the note was written at
	#[arg(long, requires = "lon", allow_hyphen_values = true)]
	pub lat: Option<f64>,

	/// Longitude of the place the note was written at
	#[arg(long, requires = "lat", allow_hyphen_values = true)]
	pub lon: Option<f64>,
}

impl NoteArgs {
	fn coordinate(&self) -> Option<Coordinate> {
		self.lat
			.zip(self.lon)
			.map(|(lat, lon)| Coordinate::new(lat, lon))
	}

	fn apply(&self, document: &mut Document) {
		document.content = self.body.join(" ");
		if let Some(tags) = &self.tags {
			document.tags = Document::parse_tags(tags);
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let data_dir = match cli.data_dir {
		Some(dir) => dir,
		None => thoughts_core::default_data_dir()?,
	};

	let config = AppConfig::load_or_create(&data_dir)?;
	config.ensure_directories()?;
	logging::init(&config)?;

	let settings = JsonFileSettingsStore::open(config.settings_path())
		.with_context(|| format!("Failed to open settings at {:?}", config.settings_path()))?;
	let mut model = ApplicationModel::new(
		Arc::new(settings),
		Arc::new(NoopGeocoder),
		Duration::from_millis(config.debounce_ms),
	)
	.await;

	let result = run(cli.command, &mut model).await;
	model.shutdown().await;
	result
}

async fn run(command: Commands, model: &mut ApplicationModel) -> Result<()> {
	match command {
		Commands::Root { path: None } => match model.root_folder() {
			Some(root) => println!("{root}"),
			None => println!("No notes folder set, choose one with `thoughts root <PATH>`"),
		},
		Commands::Root { path: Some(path) } => {
			model.set_root_folder(&path).await?;
			let root = require_root(model)?;
			println!("Notes folder set to {root} ({} tags)", model.tags().len());
		}
		Commands::Tags { prefix } => {
			require_root(model)?;
			for tag in sorted_tags(&model.tags(), prefix.as_deref().unwrap_or("")) {
				println!("{tag}");
			}
		}
		Commands::Watch => {
			let root = require_root(model)?;
			let mut tags_rx = model.subscribe_tags();
			info!(%root, "Watching notes folder;");
			println!("Watching {root}, press Ctrl-C to stop");

			loop {
				println!("{}", sorted_tags(&tags_rx.borrow_and_update(), "").join(" "));

				tokio::select! {
					biased;
					res = tokio::signal::ctrl_c() => {
						res.context("Failed to listen for Ctrl-C")?;
						break;
					}
					res = tags_rx.changed() => {
						if res.is_err() {
							break;
						}
					}
				}
			}
		}
		Commands::Location { state } => {
			model.set_should_save_location(matches!(state, Toggle::On))?;
			if model.should_save_location() {
				println!("Notes will record where they were written");
			} else {
				println!("Notes will not record where they were written");
			}
		}
		Commands::Note(args) => {
			require_root(model)?;
			let status_rx = model.subscribe_sync_status();

			model.update_document(|document| args.apply(document));
			if let Some(coordinate) = args.coordinate() {
				if !model.should_save_location() {
					warn!("Location given while location saving is off, ignoring it;");
				}
				model.set_location(coordinate).await;
			}

			// Saves the note right away instead of waiting for the debounce.
			model.new_document().await;

			let status = status_rx.borrow().clone();
			match status {
				SyncStatus::Saved(path) => println!("{}", path.display()),
				SyncStatus::Failed(reason) => bail!("Failed to save note: {reason}"),
				SyncStatus::Idle | SyncStatus::Deleted(_) => bail!("Note was not saved"),
			}
		}
	}

	Ok(())
}

fn require_root(model: &ApplicationModel) -> Result<RootFolder> {
	model
		.root_folder()
		.context("No notes folder set, choose one with `thoughts root <PATH>`")
}

fn sorted_tags(tags: &Trie, prefix: &str) -> Vec<String> {
	let mut tags = tags.words_with_prefix(prefix);
	tags.sort_unstable();
	tags
}
