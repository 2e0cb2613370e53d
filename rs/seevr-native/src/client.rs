use std::time;

use anyhow::Context;
use seevr_orient::{
	DEFAULT_FIELD_OF_VIEW, DEFAULT_FRAME_RATE, DriverConfig, MAX_FRAME_RATE, MIN_FRAME_RATE, OrientationClient, Player,
	VideoSink, ViewpointDriver,
};
use url::Url;

use crate::WebSocketTransport;

/// How orientation samples are applied to the video.
#[derive(Clone, Debug, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ClientViewpoint {
	/// The field of view sent with every viewpoint, in degrees.
	#[arg(
		id = "field-of-view",
		long = "field-of-view",
		env = "SEEVR_FIELD_OF_VIEW",
		default_value_t = DEFAULT_FIELD_OF_VIEW
	)]
	pub field_of_view: f64,

	/// The poll rate, used when the video doesn't report a frame rate.
	#[arg(
		id = "frame-rate",
		long = "frame-rate",
		env = "SEEVR_FRAME_RATE",
		default_value_t = DEFAULT_FRAME_RATE
	)]
	pub frame_rate: f64,

	/// Negate yaw, pitch and roll, for trackers that report the opposite rotation.
	#[serde(skip_serializing_if = "Option::is_none")]
	#[arg(
		id = "invert",
		long = "invert",
		env = "SEEVR_INVERT",
		default_missing_value = "true",
		num_args = 0..=1,
		value_parser = clap::value_parser!(bool),
	)]
	pub invert: Option<bool>,
}

impl Default for ClientViewpoint {
	fn default() -> Self {
		Self {
			field_of_view: DEFAULT_FIELD_OF_VIEW,
			frame_rate: DEFAULT_FRAME_RATE,
			invert: None,
		}
	}
}

/// WebSocket configuration for the client.
#[derive(Clone, Debug, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ClientWebSocket {
	/// The largest message accepted from the tracker, in bytes.
	#[arg(
		id = "max-message-size",
		long = "max-message-size",
		env = "SEEVR_MAX_MESSAGE_SIZE",
		default_value_t = 64 << 10
	)]
	pub max_message_size: usize,

	/// Send a heartbeat at this interval while connected (ex. "5s").
	/// No heartbeat is sent when unset.
	/// A heartbeat is skipped while the previous one is unanswered.
	#[arg(
		id = "heartbeat",
		long = "heartbeat",
		env = "SEEVR_HEARTBEAT",
		value_parser = humantime::parse_duration,
	)]
	#[serde(with = "humantime_serde")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub heartbeat: Option<time::Duration>,
}

impl Default for ClientWebSocket {
	fn default() -> Self {
		Self {
			max_message_size: 64 << 10,
			heartbeat: None,
		}
	}
}

/// Configuration for the orientation client.
#[derive(Clone, Debug, Default, clap::Parser, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct ClientConfig {
	/// Connect to the head tracker at this URL.
	///
	/// http:// and https:// are rewritten to ws:// and wss://.
	#[arg(id = "url", long = "url", env = "SEEVR_URL")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<Url>,

	#[command(flatten)]
	#[serde(default)]
	pub viewpoint: ClientViewpoint,

	#[command(flatten)]
	#[serde(default)]
	pub websocket: ClientWebSocket,
}

impl ClientConfig {
	pub fn init(self) -> anyhow::Result<Client> {
		Client::new(self)
	}
}

/// A validated [ClientConfig], ready to build players.
#[derive(Clone, Debug)]
pub struct Client {
	url: Option<Url>,
	driver: DriverConfig,
	websocket: ClientWebSocket,
}

impl Client {
	pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
		let ClientConfig {
			url,
			viewpoint,
			websocket,
		} = config;

		anyhow::ensure!(
			viewpoint.field_of_view.is_finite() && viewpoint.field_of_view > 0.0 && viewpoint.field_of_view < 180.0,
			"field of view must be between 0 and 180 degrees: {}",
			viewpoint.field_of_view
		);
		anyhow::ensure!(
			(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&viewpoint.frame_rate),
			"frame rate must be between {MIN_FRAME_RATE} and {MAX_FRAME_RATE}: {}",
			viewpoint.frame_rate
		);
		anyhow::ensure!(websocket.max_message_size > 0, "max message size must be positive");
		anyhow::ensure!(
			!websocket.heartbeat.is_some_and(|heartbeat| heartbeat.is_zero()),
			"heartbeat must be positive"
		);

		let url = url.map(websocket_url).transpose().context("invalid tracker URL")?;

		let driver = DriverConfig {
			field_of_view: viewpoint.field_of_view,
			frame_rate: viewpoint.frame_rate,
			invert: viewpoint.invert.unwrap_or(false),
			heartbeat: websocket.heartbeat,
		};

		Ok(Self { url, driver, websocket })
	}

	/// The tracker URL, if one was configured.
	pub fn url(&self) -> Option<&Url> {
		self.url.as_ref()
	}

	pub fn driver_config(&self) -> &DriverConfig {
		&self.driver
	}

	/// Start a player that steers the given sink.
	///
	/// It connects right away if a URL was configured, otherwise call [Player::connect].
	pub fn player<S: VideoSink + Send + 'static>(&self, sink: S) -> Player<WebSocketTransport, S> {
		let (transport, events) = WebSocketTransport::new(&self.websocket);
		let client = OrientationClient::new(transport);
		let driver = ViewpointDriver::new(client, sink, self.driver.clone());
		let player = Player::spawn(driver, events);

		if let Some(url) = &self.url {
			player.connect(url.clone());
		}

		player
	}
}

/// Convert the URL scheme: http:// -> ws://, https:// -> wss://
pub fn websocket_url(mut url: Url) -> anyhow::Result<Url> {
	let scheme = match url.scheme() {
		"ws" | "wss" => return Ok(url),
		"http" => "ws",
		"https" => "wss",
		scheme => anyhow::bail!("unsupported URL scheme for WebSocket: {scheme}"),
	};

	url.set_scheme(scheme)
		.map_err(|_| anyhow::anyhow!("failed to set scheme: {scheme}"))?;

	Ok(url)
}
