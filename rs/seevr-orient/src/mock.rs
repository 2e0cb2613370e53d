//! In-memory stand-ins for the transport and the video sink.
//!
//! Both are cheap handles around shared state, so a test can keep a clone and inspect what the driver did.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use url::Url;

use crate::{Transport, VideoSink, Viewpoint};

#[derive(Default)]
struct MockTransportState {
	opened: Vec<Url>,
	closes: usize,
	pings: Vec<Bytes>,
}

/// A transport that records calls and never reports anything on its own.
///
/// Tests script the transport by feeding [crate::TransportEvent]s to the code under test.
#[derive(Clone, Default)]
pub struct MockTransport {
	state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
	/// Every URL passed to [Transport::open], in order.
	pub fn opened(&self) -> Vec<Url> {
		self.state.lock().unwrap().opened.clone()
	}

	pub fn closes(&self) -> usize {
		self.state.lock().unwrap().closes
	}

	pub fn pings(&self) -> Vec<Bytes> {
		self.state.lock().unwrap().pings.clone()
	}
}

impl Transport for MockTransport {
	fn open(&mut self, url: &Url) {
		self.state.lock().unwrap().opened.push(url.clone());
	}

	fn close(&mut self) {
		self.state.lock().unwrap().closes += 1;
	}

	fn ping(&mut self, payload: Bytes) {
		self.state.lock().unwrap().pings.push(payload);
	}
}

#[derive(Default)]
struct RecordingSinkState {
	updates: Vec<(Viewpoint, bool)>,
	status: i32,
	frame_rate: Option<f64>,
	media_size: Option<(u32, u32)>,
}

/// A video sink that records every viewpoint update.
#[derive(Clone, Default)]
pub struct RecordingSink {
	state: Arc<Mutex<RecordingSinkState>>,
}

impl RecordingSink {
	/// Every update applied so far, with its `absolute` flag.
	pub fn updates(&self) -> Vec<(Viewpoint, bool)> {
		self.state.lock().unwrap().updates.clone()
	}

	/// Just the viewpoints, dropping the flags.
	pub fn viewpoints(&self) -> Vec<Viewpoint> {
		self.state.lock().unwrap().updates.iter().map(|(viewpoint, _)| *viewpoint).collect()
	}

	/// The status code returned by future updates.
	pub fn set_status(&self, status: i32) {
		self.state.lock().unwrap().status = status;
	}

	pub fn set_frame_rate(&self, frame_rate: Option<f64>) {
		self.state.lock().unwrap().frame_rate = frame_rate;
	}

	pub fn set_media_size(&self, size: Option<(u32, u32)>) {
		self.state.lock().unwrap().media_size = size;
	}

	pub fn clear(&self) {
		self.state.lock().unwrap().updates.clear();
	}
}

impl VideoSink for RecordingSink {
	fn media_size(&self) -> Option<(u32, u32)> {
		self.state.lock().unwrap().media_size
	}

	fn frame_rate(&self) -> Option<f64> {
		self.state.lock().unwrap().frame_rate
	}

	fn update_viewpoint(&mut self, viewpoint: &Viewpoint, absolute: bool) -> i32 {
		let mut state = self.state.lock().unwrap();
		state.updates.push((*viewpoint, absolute));
		state.status
	}
}
