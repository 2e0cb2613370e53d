use anyhow::Context;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use seevr_orient::{Transport, TransportEvent, TransportState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Message, protocol::WebSocketConfig};
use tracing::Instrument;
use url::Url;

use crate::ClientWebSocket;

/// A [Transport] over a tokio-tungstenite WebSocket.
///
/// Each [Transport::open] spawns a task that owns the socket.
/// The task reports state changes and messages on the channel returned by [WebSocketTransport::new].
pub struct WebSocketTransport {
	config: WebSocketConfig,
	events: mpsc::UnboundedSender<TransportEvent>,

	task: Option<JoinHandle<()>>,
	outgoing: Option<mpsc::UnboundedSender<Message>>,
}

impl WebSocketTransport {
	pub fn new(config: &ClientWebSocket) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
		let mut websocket = WebSocketConfig::default();
		websocket.max_message_size = Some(config.max_message_size);
		websocket.max_frame_size = Some(config.max_message_size);

		let (events, events_rx) = mpsc::unbounded_channel();

		let transport = Self {
			config: websocket,
			events,
			task: None,
			outgoing: None,
		};

		(transport, events_rx)
	}

	fn report(&self, state: TransportState) {
		let _ = self.events.send(TransportEvent::State(state));
	}

	// Returns true if a live socket task was aborted.
	fn abort(&mut self) -> bool {
		self.outgoing = None;

		match self.task.take() {
			Some(task) if !task.is_finished() => {
				task.abort();
				true
			}
			_ => false,
		}
	}
}

impl Transport for WebSocketTransport {
	fn open(&mut self, url: &Url) {
		if self.abort() {
			tracing::debug!("replacing existing websocket");
		}

		let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
		self.outgoing = Some(outgoing);

		self.report(TransportState::Connecting);

		let url = url.clone();
		let config = self.config.clone();
		let events = self.events.clone();

		let task = tokio::spawn(
			async move {
				match run(&url, config, &events, outgoing_rx).await {
					Ok(()) => tracing::debug!(%url, "websocket closed"),
					Err(err) => tracing::warn!(%err, %url, "websocket error"),
				}

				let _ = events.send(TransportEvent::State(TransportState::Unconnected));
			}
			.in_current_span(),
		);

		self.task = Some(task);
	}

	fn close(&mut self) {
		// The aborted task never reports, so report for it.
		if self.abort() {
			self.report(TransportState::Closing);
			self.report(TransportState::Unconnected);
		}
	}

	fn ping(&mut self, payload: Bytes) {
		match &self.outgoing {
			Some(outgoing) => {
				let _ = outgoing.send(Message::Ping(payload));
			}
			None => tracing::debug!("dropping ping, not connected"),
		}
	}
}

impl Drop for WebSocketTransport {
	fn drop(&mut self) {
		self.abort();
	}
}

async fn run(
	url: &Url,
	config: WebSocketConfig,
	events: &mpsc::UnboundedSender<TransportEvent>,
	mut outgoing: mpsc::UnboundedReceiver<Message>,
) -> anyhow::Result<()> {
	tracing::debug!(%url, "connecting via WebSocket");

	// Samples are tiny and latency matters more than throughput.
	let (socket, _response) = tokio_tungstenite::connect_async_with_config(url.as_str(), Some(config), true)
		.await
		.context("failed to connect WebSocket")?;

	if events.send(TransportEvent::State(TransportState::Connected)).is_err() {
		return Ok(());
	}

	let (mut writer, mut reader) = socket.split();

	loop {
		tokio::select! {
			msg = reader.next() => {
				let event = match msg {
					Some(Ok(Message::Binary(data))) => TransportEvent::Message(data),
					Some(Ok(Message::Pong(data))) => TransportEvent::Pong(data),
					Some(Ok(Message::Close(frame))) => {
						tracing::debug!(?frame, "websocket close received");
						let _ = events.send(TransportEvent::State(TransportState::Closing));
						return Ok(());
					}
					Some(Ok(msg)) => {
						// Pings are answered by tungstenite itself.
						tracing::trace!(?msg, "ignoring websocket message");
						continue;
					}
					Some(Err(err)) => return Err(err).context("websocket read failed"),
					None => return Ok(()),
				};

				if events.send(event).is_err() {
					return Ok(());
				}
			}
			Some(msg) = outgoing.recv() => {
				writer.send(msg).await.context("websocket write failed")?;
			}
		}
	}
}
