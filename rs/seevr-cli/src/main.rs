use anyhow::Context;
use clap::{Parser, Subcommand};
use seevr_native::seevr_orient::{ConnectionEvent, MAX_FRAME_RATE, MIN_FRAME_RATE};
use tokio::sync::broadcast;

mod motion;
mod sink;

#[derive(Parser, Clone)]
#[command(name = "seevr", version, about = "Stream head orientation into a 360° video viewpoint")]
pub struct Config {
	/// The log configuration.
	#[command(flatten)]
	pub log: seevr_native::Log,

	/// Whether to follow a tracker or imitate one.
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
	/// Follow a tracker, logging every viewpoint it produces.
	Subscribe {
		/// The orientation client configuration.
		#[command(flatten)]
		client: seevr_native::ClientConfig,

		/// Pretend the video plays at this frame rate.
		#[arg(long = "media-frame-rate", value_parser = parse_frame_rate)]
		media_frame_rate: Option<f64>,
	},

	/// Serve a synthetic, slowly rotating orientation.
	Publish(motion::Args),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config = Config::parse();
	config.log.init();

	match config.command {
		Command::Subscribe {
			client,
			media_frame_rate,
		} => subscribe(client, media_frame_rate).await,
		Command::Publish(args) => motion::run(args).await,
	}
}

fn parse_frame_rate(value: &str) -> anyhow::Result<f64> {
	let rate: f64 = value.parse().context("invalid frame rate")?;
	anyhow::ensure!(
		(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&rate),
		"frame rate must be between {MIN_FRAME_RATE} and {MAX_FRAME_RATE}"
	);
	Ok(rate)
}

async fn subscribe(config: seevr_native::ClientConfig, media_frame_rate: Option<f64>) -> anyhow::Result<()> {
	let client = config.init()?;
	let url = client.url().cloned().context("missing --url")?;

	tracing::info!(%url, "connecting to tracker");

	let player = client.player(sink::LogSink::new(media_frame_rate));
	let mut events = player.subscribe();

	loop {
		tokio::select! {
			event = events.recv() => match event {
				Ok(ConnectionEvent::Connected) => tracing::info!(%url, "tracker online"),
				Ok(ConnectionEvent::Disconnected) => tracing::warn!(%url, "tracker offline, reconnecting"),
				Err(broadcast::error::RecvError::Lagged(skipped)) => tracing::debug!(skipped, "missed events"),
				Err(broadcast::error::RecvError::Closed) => break,
			},
			res = tokio::signal::ctrl_c() => {
				res.context("failed to listen for ctrl-c")?;
				break;
			}
		}
	}

	let driver = player.shutdown().await.context("player failed")?;
	tracing::info!(driver = ?driver.stats(), client = ?driver.client().stats(), "stopped");

	Ok(())
}
