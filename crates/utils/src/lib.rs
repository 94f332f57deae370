pub mod error;

pub use error::FileIOError;

/// Dotfile names (`.DS_Store`, `.note.md.tmp`, ...) are hidden from scans and watchers.
pub fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
	name.as_encoded_bytes().first() == Some(&b'.')
}
