use std::fmt;

use bytes::Bytes;
use url::Url;

/// The state of the underlying socket, as reported by the transport.
///
/// Orientation logic only observes these transitions, it never sets them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
	#[default]
	Unconnected,
	HostLookup,
	Connecting,
	Connected,
	Closing,
}

impl TransportState {
	/// [Self::HostLookup] and [Self::Closing] are transient and never acted upon.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::HostLookup | Self::Closing)
	}
}

impl fmt::Display for TransportState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Unconnected => "unconnected",
			Self::HostLookup => "host lookup",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::Closing => "closing",
		};
		f.write_str(name)
	}
}

/// Everything a transport reports back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
	State(TransportState),
	/// A complete binary message.
	Message(Bytes),
	/// The echo of a heartbeat probe.
	Pong(Bytes),
}

/// A duplex, message-oriented link to the orientation source.
///
/// None of these methods block.
/// Their outcome is reported later as [TransportEvent]s,
/// delivered on whatever channel the implementation was built with.
pub trait Transport {
	/// Start connecting to the given URL, abandoning any existing link.
	fn open(&mut self, url: &Url);

	/// Close the link, if any.
	fn close(&mut self);

	/// Send a heartbeat probe carrying the payload.
	fn ping(&mut self, payload: Bytes);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
	fn open(&mut self, url: &Url) {
		(**self).open(url)
	}

	fn close(&mut self) {
		(**self).close()
	}

	fn ping(&mut self, payload: Bytes) {
		(**self).ping(payload)
	}
}
