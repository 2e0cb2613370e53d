use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Clone, Debug, clap::Args, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Log {
	/// The level filter to use, unless overridden by `RUST_LOG`.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "SEEVR_LOG_LEVEL")]
	#[serde(with = "level")]
	pub level: Level,
}

impl Default for Log {
	fn default() -> Self {
		Self { level: Level::INFO }
	}
}

impl Log {
	pub fn new(level: Level) -> Self {
		Self { level }
	}

	/// Install a global subscriber writing to stderr.
	///
	/// Does nothing if a subscriber is already installed.
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(LevelFilter::from_level(self.level).into())
			.from_env_lossy();

		let res = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.try_init();

		if res.is_err() {
			tracing::debug!("logger already initialized");
		}
	}
}

mod level {
	use std::str::FromStr;

	use serde::{Deserialize, Deserializer, Serializer, de::Error};
	use tracing::Level;

	pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(level.as_str())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
		let level = String::deserialize(deserializer)?;
		Level::from_str(&level).map_err(D::Error::custom)
	}
}
