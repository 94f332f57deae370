//! Application configuration

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::default_data_dir;

const CONFIG_FILE: &str = "thoughts.json";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level, used when `RUST_LOG` is not set
	pub log_level: String,

	/// Quiet period after the last edit before a note is written to disk
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,

	/// Settings store file name (relative to data_dir)
	#[serde(default = "default_settings_file")]
	pub settings_file: String,
}

fn default_debounce_ms() -> u64 {
	200
}

fn default_settings_file() -> String {
	"settings.json".to_string()
}

impl AppConfig {
	pub const CURRENT_VERSION: u32 = 1;

	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)
				.with_context(|| format!("Failed to read {}", config_path.display()))?;
			let config: AppConfig = serde_json::from_str(&json)
				.with_context(|| format!("Failed to parse {}", config_path.display()))?;

			if config.version > Self::CURRENT_VERSION {
				bail!(
					"Config version {} is newer than supported version {}",
					config.version,
					Self::CURRENT_VERSION
				);
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Load or create configuration
	pub fn load_or_create(data_dir: &Path) -> Result<Self> {
		Self::load_from(data_dir).or_else(|e| {
			warn!(?e, "Failed to load config, replacing it with defaults;");
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		})
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::CURRENT_VERSION,
			data_dir,
			log_level: "info".to_string(),
			debounce_ms: default_debounce_ms(),
			settings_file: default_settings_file(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		// Ensure directory exists
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	/// Get the path for logs directory
	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	/// Get the path of the settings store
	pub fn settings_path(&self) -> PathBuf {
		self.data_dir.join(&self.settings_file)
	}

	/// Ensure all required directories exist
	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		Ok(())
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
		Self::default_with_dir(data_dir)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tempfile::tempdir;

	use super::*;

	#[test]
	fn creates_then_reloads_defaults() {
		let dir = tempdir().unwrap();

		let created = AppConfig::load_or_create(dir.path()).unwrap();
		assert!(dir.path().join(CONFIG_FILE).exists());
		assert_eq!(created.debounce_ms, 200);
		assert_eq!(created.settings_path(), dir.path().join("settings.json"));

		let mut changed = created.clone();
		changed.debounce_ms = 50;
		changed.save().unwrap();

		assert_eq!(AppConfig::load_from(dir.path()).unwrap(), changed);
	}

	#[test]
	fn missing_fields_take_defaults() {
		let dir = tempdir().unwrap();
		fs::write(
			dir.path().join(CONFIG_FILE),
			format!(
				r#"{{"version": 1, "data_dir": {:?}, "log_level": "debug"}}"#,
				dir.path()
			),
		)
		.unwrap();

		let config = AppConfig::load_from(dir.path()).unwrap();
		assert_eq!(config.log_level, "debug");
		assert_eq!(config.debounce_ms, 200);
		assert_eq!(config.settings_file, "settings.json");
	}

	#[test]
	fn newer_versions_are_rejected_but_recoverable() {
		let dir = tempdir().unwrap();
		let mut future = AppConfig::default_with_dir(dir.path().to_path_buf());
		future.version = AppConfig::CURRENT_VERSION + 1;
		future.save().unwrap();

		assert!(AppConfig::load_from(dir.path()).is_err());
		assert_eq!(
			AppConfig::load_or_create(dir.path()).unwrap().version,
			AppConfig::CURRENT_VERSION
		);
	}
}
