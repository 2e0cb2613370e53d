use std::net;

use anyhow::Context;
use futures::{SinkExt, StreamExt};
use seevr_orient::Orientation;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message;
use tracing::Instrument;

/// Serves orientation samples to WebSocket clients, the way a head tracker would.
///
/// Every client gets the current orientation when it connects and again whenever it changes.
pub struct Publisher {
	listener: TcpListener,
	orientation: watch::Receiver<Orientation>,
}

impl Publisher {
	pub async fn bind(addr: net::SocketAddr, orientation: watch::Receiver<Orientation>) -> anyhow::Result<Self> {
		let listener = TcpListener::bind(addr).await.context("failed to bind")?;
		Ok(Self { listener, orientation })
	}

	pub fn local_addr(&self) -> anyhow::Result<net::SocketAddr> {
		self.listener.local_addr().context("failed to get local address")
	}

	/// Accept clients until an error occurs. Dropping the future disconnects every client.
	pub async fn run(self) -> anyhow::Result<()> {
		tracing::info!(addr = %self.local_addr()?, "listening");

		let mut clients = JoinSet::new();

		loop {
			tokio::select! {
				res = self.listener.accept() => {
					let (stream, peer) = res.context("failed to accept")?;
					let orientation = self.orientation.clone();

					clients.spawn(
						async move {
							match serve(stream, orientation).await {
								Ok(()) => tracing::info!(%peer, "client closed"),
								Err(err) => tracing::warn!(%err, %peer, "client error"),
							}
						}
						.in_current_span(),
					);
				}
				Some(_) = clients.join_next() => {}
			}
		}
	}
}

async fn serve(stream: TcpStream, mut orientation: watch::Receiver<Orientation>) -> anyhow::Result<()> {
	stream.set_nodelay(true)?;

	let socket = tokio_tungstenite::accept_async(stream)
		.await
		.context("failed to accept WebSocket")?;
	let (mut writer, mut reader) = socket.split();

	tracing::info!("client connected");

	let mut changed = true;

	loop {
		if changed {
			let sample = *orientation.borrow_and_update();
			writer
				.send(Message::Binary(sample.encode()))
				.await
				.context("failed to send sample")?;
		}

		changed = tokio::select! {
			res = orientation.changed() => {
				if res.is_err() {
					// Nothing left to publish.
					writer.send(Message::Close(None)).await.ok();
					return Ok(());
				}
				true
			}
			msg = reader.next() => match msg {
				Some(Ok(Message::Close(_))) | None => return Ok(()),
				Some(Ok(msg)) => {
					tracing::trace!(?msg, "ignoring client message");
					false
				}
				Some(Err(err)) => return Err(err.into()),
			},
		};
	}
}
