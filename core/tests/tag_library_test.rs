//! Tag library integration tests
//!
//! Drives a real notes folder through the file system watcher and checks the published tag set
//! follows notes being written, edited and removed, including notes written by [`Document`].

use std::{fs, path::Path, sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};
use thoughts_core::{Document, RootFolder, SyncOutcome, TagLibrary, Trie};
use thoughts_fs_watcher::ScannerStatus;
use tokio::{sync::watch, time::timeout};
use tracing_test::traced_test;

fn setup() -> (TempDir, RootFolder) {
	let dir = tempdir().unwrap();
	fs::create_dir(dir.path().join("notes")).unwrap();
	let root = RootFolder::new(dir.path().join("notes")).unwrap();
	(dir, root)
}

/// Writes through a hidden temporary file, so the watcher never sees a half written note.
fn write_note(root: &Path, name: &str, tags: &[&str]) {
	let staging = root.join(format!(".{name}.tmp"));
	fs::write(
		&staging,
		format!("---\ntags: [{}]\n---\n\nbody", tags.join(", ")),
	)
	.unwrap();
	fs::rename(staging, root.join(name)).unwrap();
}

fn sorted(trie: &Trie) -> Vec<String> {
	let mut words = trie.words_with_prefix("");
	words.sort();
	words
}

/// Waits for the published tag set to become `expected`.
async fn expect_tags(tags_rx: &mut watch::Receiver<Arc<Trie>>, expected: &[&str]) {
	let result = timeout(Duration::from_secs(5), async {
		loop {
			if sorted(&tags_rx.borrow_and_update()) == expected {
				return;
			}
			tags_rx.changed().await.unwrap();
		}
	})
	.await;

	assert!(
		result.is_ok(),
		"expected tags {expected:?}, found {:?}",
		sorted(&tags_rx.borrow())
	);
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn existing_notes_are_indexed_before_start_resolves() {
	let (_dir, root) = setup();
	write_note(root.path(), "a.md", &["travel", "food"]);
	write_note(root.path(), "b.markdown", &["ideas"]);
	write_note(root.path(), "c.txt", &["ignored"]);
	write_note(root.path(), ".hidden.md", &["secret"]);

	let mut library = TagLibrary::new(&root);
	library.start(vec![]).await.unwrap();

	assert_eq!(library.status(), ScannerStatus::Running);
	assert_eq!(sorted(&library.tags()), vec!["food", "ideas", "travel"]);

	library.stop().await;
	assert_eq!(library.status(), ScannerStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn tags_follow_notes_on_disk() {
	let (dir, root) = setup();
	write_note(root.path(), "a.md", &["travel"]);

	let mut library = TagLibrary::new(&root);
	let mut tags_rx = library.subscribe();
	library.start(vec![]).await.unwrap();
	expect_tags(&mut tags_rx, &["travel"]).await;

	write_note(root.path(), "b.md", &["food"]);
	expect_tags(&mut tags_rx, &["food", "travel"]).await;

	write_note(root.path(), "a.md", &["psion", "psion/series-5"]);
	expect_tags(&mut tags_rx, &["food", "psion", "psion/series-5"]).await;
	assert_eq!(library.tags().words_with_prefix("psiona"), Vec::<String>::new());

	fs::remove_file(root.path().join("b.md")).unwrap();
	expect_tags(&mut tags_rx, &["psion", "psion/series-5"]).await;

	let staging = dir.path().join("journal");
	fs::create_dir(&staging).unwrap();
	write_note(&staging, "c.md", &["nested"]);
	fs::rename(&staging, root.path().join("journal")).unwrap();
	expect_tags(&mut tags_rx, &["nested", "psion", "psion/series-5"]).await;

	fs::remove_dir_all(root.path().join("journal")).unwrap();
	expect_tags(&mut tags_rx, &["psion", "psion/series-5"]).await;

	library.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn saved_documents_are_picked_up() {
	let (_dir, root) = setup();
	let mut library = TagLibrary::new(&root);
	let mut tags_rx = library.subscribe();
	library.start(vec![]).await.unwrap();

	let mut document = Document::now();
	document.content = "Lunch".to_owned();
	document.tags = Document::parse_tags("food travel");
	assert!(matches!(
		document.sync(root.path()).unwrap(),
		SyncOutcome::Written(_)
	));
	expect_tags(&mut tags_rx, &["food", "travel"]).await;

	// Rewrites replace the file atomically.
	document.tags = Document::parse_tags("food");
	document.sync(root.path()).unwrap();
	expect_tags(&mut tags_rx, &["food"]).await;

	document.content.clear();
	assert!(matches!(
		document.sync(root.path()).unwrap(),
		SyncOutcome::Deleted(_)
	));
	expect_tags(&mut tags_rx, &[]).await;

	library.stop().await;
}
