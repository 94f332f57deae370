use anyhow::{Context, Result};
use thoughts_core::AppConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs to stderr and to a daily rotated file under `{data_dir}/logs`.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &AppConfig) -> Result<()> {
	let file_appender = RollingFileAppender::new(Rotation::DAILY, config.logs_dir(), "thoughts.log");

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(format!(
			"thoughts={level},thoughts_core={level},thoughts_fs_watcher={level}",
			level = config.log_level
		))
	});

	tracing_subscriber::registry()
		.with(env_filter)
		.with(
			fmt::layer()
				.with_target(true)
				.with_writer(std::io::stderr),
		)
		.with(
			fmt::layer()
				.with_target(true)
				.with_thread_ids(true)
				.with_ansi(false)
				.with_writer(file_appender),
		)
		.try_init()
		.context("Failed to initialize tracing")
}
