use url::Url;

use crate::{
	Connection, ConnectionEvent, Orientation, RawSample, Result, SampleSlot, Transport, TransportEvent, TransportState,
};

/// Counters kept by the [OrientationClient].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
	/// Binary messages received while connected.
	pub messages: u64,
	/// Messages discarded for having the wrong size.
	pub malformed: u64,
	/// Samples handed out by [OrientationClient::new_sample].
	pub consumed: u64,
}

/// Buffers the newest orientation sample received over a [Connection].
pub struct OrientationClient<T> {
	connection: Connection<T>,
	slot: SampleSlot,
	stats: ClientStats,
}

impl<T: Transport> OrientationClient<T> {
	pub fn new(transport: T) -> Self {
		Self {
			connection: Connection::new(transport),
			slot: SampleSlot::default(),
			stats: ClientStats::default(),
		}
	}

	pub fn connect(&mut self, url: Url) {
		self.connection.connect(url)
	}

	pub fn disconnect(&mut self) {
		self.connection.disconnect()
	}

	/// Process an event reported by the transport.
	pub fn handle(&mut self, event: TransportEvent) -> Result<()> {
		match event {
			TransportEvent::State(state) => {
				self.connection.on_state(state);
				Ok(())
			}
			TransportEvent::Message(payload) => self.on_message(&payload),
			TransportEvent::Pong(payload) => self.connection.on_pong(payload),
		}
	}

	/// Replace the current sample with the message.
	///
	/// A message of the wrong size is rejected and the current sample is left untouched.
	pub fn on_message(&mut self, payload: &[u8]) -> Result<()> {
		if !self.connection.is_expected() {
			tracing::trace!(size = payload.len(), "ignoring message after disconnect");
			return Ok(());
		}

		self.stats.messages += 1;

		match RawSample::try_from(payload) {
			Ok(raw) => {
				self.slot.store(raw);
				Ok(())
			}
			Err(err) => {
				self.stats.malformed += 1;
				Err(err)
			}
		}
	}

	/// The newest sample, if it differs from the one returned last time.
	pub fn new_sample(&mut self) -> Option<Orientation> {
		let raw = self.slot.take_new()?;
		self.stats.consumed += 1;
		Some(raw.decode())
	}

	pub fn ping(&mut self) -> Result<()> {
		self.connection.ping()
	}

	pub fn run_scheduled(&mut self) -> bool {
		self.connection.run_scheduled()
	}

	pub fn poll_event(&mut self) -> Option<ConnectionEvent> {
		self.connection.poll_event()
	}

	pub fn state(&self) -> TransportState {
		self.connection.state()
	}

	pub fn is_connected(&self) -> bool {
		self.connection.is_connected()
	}

	pub fn connection(&self) -> &Connection<T> {
		&self.connection
	}

	pub fn stats(&self) -> ClientStats {
		self.stats
	}
}
