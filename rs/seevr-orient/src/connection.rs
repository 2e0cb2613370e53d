use std::collections::VecDeque;

use bytes::Bytes;
use rand::Rng;
use tokio::time::Instant;
use url::Url;

use crate::{Error, Result, Transport, TransportState};

const PING_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PING_SIZE: usize = 6;

/// Reported to whoever embeds the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
	Connected,
	Disconnected,
}

struct Ping {
	token: Bytes,
	sent: Instant,
}

/// A connection that keeps itself open for as long as the caller wants it to be.
///
/// The caller's intent is tracked separately from the transport state.
/// Whenever the transport drops to [TransportState::Unconnected] while the intent is still set, another attempt is
/// scheduled immediately, with no backoff and no limit.
///
/// Attempts are never made inside a handler.
/// They are scheduled, and the dispatcher runs them with [Self::run_scheduled] on its next turn.
pub struct Connection<T> {
	transport: T,
	url: Option<Url>,

	// Set by connect, cleared only by disconnect.
	expected: bool,
	scheduled: bool,

	state: TransportState,

	// Whether we told the caller about the current link.
	announced: bool,

	ping: Option<Ping>,
	attempts: u64,
	events: VecDeque<ConnectionEvent>,
}

impl<T: Transport> Connection<T> {
	pub fn new(transport: T) -> Self {
		Self {
			transport,
			url: None,
			expected: false,
			scheduled: false,
			state: TransportState::Unconnected,
			announced: false,
			ping: None,
			attempts: 0,
			events: VecDeque::new(),
		}
	}

	/// Maintain a connection to the given URL until [Self::disconnect] is called.
	pub fn connect(&mut self, url: Url) {
		tracing::info!(%url, "connect requested");

		self.url = Some(url);
		self.expected = true;
		self.schedule();
	}

	/// Stop maintaining the connection and close the transport.
	///
	/// Calling this more than once is harmless.
	pub fn disconnect(&mut self) {
		if !self.expected {
			return;
		}

		tracing::info!(url = self.url.as_ref().map(Url::as_str), "disconnecting");

		self.expected = false;
		self.scheduled = false;
		self.ping = None;

		if std::mem::take(&mut self.announced) {
			self.events.push_back(ConnectionEvent::Disconnected);
		}

		self.transport.close();
	}

	/// Record a transition reported by the transport.
	pub fn on_state(&mut self, state: TransportState) {
		let previous = std::mem::replace(&mut self.state, state);
		if previous == state {
			return;
		}

		tracing::debug!(%previous, %state, "transport state changed");

		if state != TransportState::Connected {
			self.ping = None;

			if std::mem::take(&mut self.announced) {
				tracing::info!(%state, "disconnected");
				self.events.push_back(ConnectionEvent::Disconnected);
			}
		}

		match state {
			TransportState::Unconnected if self.expected => {
				tracing::debug!("connection lost, retrying");
				self.schedule();
			}
			TransportState::Connected if !self.expected => {
				// A late completion of an attempt we no longer want.
				tracing::debug!("connected after disconnect, closing");
				self.transport.close();
			}
			TransportState::Connected => {
				tracing::info!(url = self.url.as_ref().map(Url::as_str), "connected");
				self.announced = true;
				self.events.push_back(ConnectionEvent::Connected);
			}
			_ => {}
		}
	}

	/// Run the scheduled attempt, if any. Returns true if the transport was opened.
	pub fn run_scheduled(&mut self) -> bool {
		if !std::mem::take(&mut self.scheduled) || !self.expected {
			return false;
		}

		let Some(url) = self.url.as_ref() else {
			return false;
		};

		self.attempts += 1;
		tracing::debug!(%url, attempt = self.attempts, "opening connection");
		self.transport.open(url);

		true
	}

	/// Send a heartbeat probe with a fresh random token.
	///
	/// Does nothing while the previous probe is unanswered, so a slow pong is never mistaken for a mismatch.
	pub fn ping(&mut self) -> Result<()> {
		if self.state != TransportState::Connected {
			return Err(Error::NotConnected);
		}

		if let Some(ping) = &self.ping {
			tracing::debug!(token = ?ping.token, elapsed = ?ping.sent.elapsed(), "previous ping unanswered, skipping");
			return Ok(());
		}

		let mut rng = rand::rng();
		let token: Vec<u8> = (0..PING_SIZE)
			.map(|_| PING_CHARSET[rng.random_range(0..PING_CHARSET.len())])
			.collect();
		let token = Bytes::from(token);

		tracing::trace!(token = ?token, "ping");
		self.transport.ping(token.clone());
		self.ping = Some(Ping {
			token,
			sent: Instant::now(),
		});

		Ok(())
	}

	/// Check the echo of the outstanding probe.
	///
	/// A mismatch force-closes the transport but leaves the intent set, so the link is re-established.
	pub fn on_pong(&mut self, payload: Bytes) -> Result<()> {
		let Some(ping) = self.ping.take() else {
			tracing::debug!(payload = ?payload, "ignoring unsolicited pong");
			return Ok(());
		};

		if ping.token != payload {
			tracing::warn!(expected = ?ping.token, received = ?payload, "pong mismatch, closing");
			self.transport.close();
			return Err(Error::ProtocolViolation("pong payload mismatch"));
		}

		tracing::debug!(rtt = ?ping.sent.elapsed(), "pong");
		Ok(())
	}

	/// The next event for the embedding application.
	pub fn poll_event(&mut self) -> Option<ConnectionEvent> {
		self.events.pop_front()
	}

	pub fn state(&self) -> TransportState {
		self.state
	}

	pub fn is_connected(&self) -> bool {
		self.state == TransportState::Connected
	}

	/// Whether the caller wants the connection maintained.
	pub fn is_expected(&self) -> bool {
		self.expected
	}

	/// Whether an attempt is waiting for the next dispatcher turn.
	pub fn is_scheduled(&self) -> bool {
		self.scheduled
	}

	pub fn url(&self) -> Option<&Url> {
		self.url.as_ref()
	}

	/// The number of times the transport was opened.
	pub fn attempts(&self) -> u64 {
		self.attempts
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	fn schedule(&mut self) {
		if !self.scheduled {
			tracing::trace!("connection attempt scheduled");
		}
		self.scheduled = true;
	}
}
