use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use url::Url;

use crate::{ConnectionEvent, Orientation, OrientationClient, Transport, TransportEvent, VideoSink, Viewpoint};

pub const DEFAULT_FIELD_OF_VIEW: f64 = 80.0;
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Frame rates outside this range are ignored, keeping the poll period between 1ms and 1s.
pub const MIN_FRAME_RATE: f64 = 1.0;
pub const MAX_FRAME_RATE: f64 = 1000.0;

// The shortest poll or heartbeat period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// The yaw offset used to force the renderer to recompute its geometry.
pub const REDRAW_EPSILON: f64 = 1e-20;

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
	/// The field of view sent with every viewpoint, in degrees.
	pub field_of_view: f64,

	/// The poll rate used when the sink doesn't report a frame rate.
	pub frame_rate: f64,

	/// Negate yaw, pitch and roll before applying them.
	pub invert: bool,

	/// Probe the connection at this interval while connected.
	///
	/// A probe is skipped while the previous one is unanswered. A zero interval disables the heartbeat.
	pub heartbeat: Option<Duration>,
}

impl Default for DriverConfig {
	fn default() -> Self {
		Self {
			field_of_view: DEFAULT_FIELD_OF_VIEW,
			frame_rate: DEFAULT_FRAME_RATE,
			invert: false,
			heartbeat: None,
		}
	}
}

/// Counters kept by the [ViewpointDriver].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriverStats {
	pub ticks: u64,
	pub applied: u64,
	pub corrections: u64,
	pub sink_errors: u64,
	pub timer_starts: u64,
	pub timer_stops: u64,
}

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
	Poll,
	Heartbeat,
}

/// Polls the [OrientationClient] at the video frame rate and steers the [VideoSink].
///
/// The poll timer only exists while the connection is up.
/// It is created when the connection reports [ConnectionEvent::Connected] and dropped on
/// [ConnectionEvent::Disconnected], on [Self::disconnect] and on [Self::shutdown].
pub struct ViewpointDriver<T, S> {
	client: OrientationClient<T>,
	sink: S,
	config: DriverConfig,

	poll: Option<Interval>,
	heartbeat: Option<Interval>,

	// The last real sample, never a perturbed one.
	current: Orientation,

	stats: DriverStats,
	events: VecDeque<ConnectionEvent>,
}

impl<T: Transport, S: VideoSink> ViewpointDriver<T, S> {
	pub fn new(client: OrientationClient<T>, sink: S, config: DriverConfig) -> Self {
		Self {
			client,
			sink,
			config,
			poll: None,
			heartbeat: None,
			current: Orientation::default(),
			stats: DriverStats::default(),
			events: VecDeque::new(),
		}
	}

	pub fn connect(&mut self, url: Url) {
		self.client.connect(url);
		self.sync();
	}

	/// Stop polling and close the connection.
	pub fn disconnect(&mut self) {
		self.stop_timers();
		self.client.disconnect();
		self.sync();
	}

	pub fn shutdown(&mut self) {
		tracing::debug!(stats = ?self.stats, "driver shutting down");
		self.disconnect();
	}

	pub fn handle(&mut self, event: TransportEvent) {
		if let Err(err) = self.client.handle(event) {
			tracing::warn!(%err, "discarded transport event");
		}
		self.sync();
	}

	/// Run a connection attempt scheduled by a previous handler.
	pub fn run_scheduled(&mut self) -> bool {
		let opened = self.client.run_scheduled();
		self.sync();
		opened
	}

	/// Wait for the next timer to fire. Never resolves while disconnected.
	pub async fn next_timer(&mut self) -> Timer {
		tokio::select! {
			_ = next_tick(&mut self.poll) => Timer::Poll,
			_ = next_tick(&mut self.heartbeat) => Timer::Heartbeat,
		}
	}

	pub fn on_timer(&mut self, timer: Timer) {
		match timer {
			Timer::Poll => self.tick(),
			Timer::Heartbeat => self.ping(),
		}
	}

	/// Apply the newest sample, if there is one.
	pub fn tick(&mut self) {
		if !self.is_polling() {
			return;
		}

		self.stats.ticks += 1;

		if let Some(sample) = self.client.new_sample() {
			self.apply(sample);
		}
	}

	pub fn ping(&mut self) {
		if let Err(err) = self.client.ping() {
			tracing::debug!(%err, "skipped heartbeat");
		}
	}

	/// The playback surface changed size.
	pub fn resize(&mut self, width: u32, height: u32) {
		tracing::debug!(width, height, media = ?self.sink.media_size(), "surface resized");
		self.redraw();
	}

	pub fn poll_event(&mut self) -> Option<ConnectionEvent> {
		self.events.pop_front()
	}

	pub fn is_polling(&self) -> bool {
		self.poll.is_some()
	}

	/// The poll period, derived from the sink's frame rate when it reports a sane one.
	///
	/// Rates outside [MIN_FRAME_RATE]..=[MAX_FRAME_RATE] fall back to the configured rate,
	/// then to [DEFAULT_FRAME_RATE].
	pub fn period(&self) -> Duration {
		let rate = self
			.sink
			.frame_rate()
			.filter(is_sane_rate)
			.or(Some(self.config.frame_rate).filter(is_sane_rate))
			.unwrap_or(DEFAULT_FRAME_RATE);

		Duration::try_from_secs_f64(1.0 / rate)
			.unwrap_or(MIN_PERIOD)
			.max(MIN_PERIOD)
	}

	/// The last sample applied to the sink.
	pub fn current(&self) -> Orientation {
		self.current
	}

	pub fn client(&self) -> &OrientationClient<T> {
		&self.client
	}

	pub fn sink(&self) -> &S {
		&self.sink
	}

	pub fn sink_mut(&mut self) -> &mut S {
		&mut self.sink
	}

	pub fn config(&self) -> &DriverConfig {
		&self.config
	}

	pub fn stats(&self) -> DriverStats {
		self.stats
	}

	fn sync(&mut self) {
		while let Some(event) = self.client.poll_event() {
			match event {
				ConnectionEvent::Connected => self.start_timers(),
				ConnectionEvent::Disconnected => self.stop_timers(),
			}
			self.events.push_back(event);
		}
	}

	fn start_timers(&mut self) {
		if self.poll.is_some() {
			return;
		}

		let period = self.period();
		tracing::debug!(?period, "polling started");

		self.poll = Some(interval(period));
		self.heartbeat = self.config.heartbeat.filter(|heartbeat| !heartbeat.is_zero()).map(interval);
		self.stats.timer_starts += 1;
	}

	fn stop_timers(&mut self) {
		self.heartbeat = None;

		if self.poll.take().is_some() {
			tracing::debug!("polling stopped");
			self.stats.timer_stops += 1;
		}
	}

	fn apply(&mut self, sample: Orientation) {
		self.current = sample;
		self.stats.applied += 1;

		if self.update(sample) {
			self.redraw();
		}
	}

	// Nudge the yaw so the renderer recomputes the aspect ratio.
	// Always relative to the last real sample so it can't drift.
	fn redraw(&mut self) {
		let nudged = Orientation {
			yaw: self.current.yaw + REDRAW_EPSILON,
			..self.current
		};

		self.stats.corrections += 1;
		self.update(nudged);
	}

	fn update(&mut self, orientation: Orientation) -> bool {
		let orientation = if self.config.invert {
			orientation.inverted()
		} else {
			orientation
		};

		let viewpoint = Viewpoint::new(orientation, self.config.field_of_view);
		let status = self.sink.update_viewpoint(&viewpoint, true);
		if status != 0 {
			self.stats.sink_errors += 1;
			tracing::error!(status, ?viewpoint, "failed to update viewpoint");
			return false;
		}

		true
	}
}

fn is_sane_rate(rate: &f64) -> bool {
	rate.is_finite() && (MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(rate)
}

fn interval(period: Duration) -> Interval {
	// tokio panics on a zero period.
	let period = period.max(MIN_PERIOD);

	// The first tick is one period away, not immediate.
	let mut interval = tokio::time::interval_at(Instant::now() + period, period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
	interval
}

async fn next_tick(interval: &mut Option<Interval>) {
	match interval {
		Some(interval) => {
			interval.tick().await;
		}
		None => std::future::pending().await,
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		mock::{MockTransport, RecordingSink},
		TransportState,
	};
	use futures::FutureExt;

	type Driver = ViewpointDriver<MockTransport, RecordingSink>;

	fn driver(config: DriverConfig) -> (Driver, RecordingSink) {
		let sink = RecordingSink::default();
		let client = OrientationClient::new(MockTransport::default());
		(ViewpointDriver::new(client, sink.clone(), config), sink)
	}

	fn connect(driver: &mut Driver) {
		driver.connect(Url::parse("ws://localhost:8080/").unwrap());
		assert!(driver.run_scheduled());
		driver.handle(TransportEvent::State(TransportState::Connecting));
		driver.handle(TransportEvent::State(TransportState::Connected));
	}

	fn send(driver: &mut Driver, orientation: Orientation) {
		driver.handle(TransportEvent::Message(orientation.encode()));
	}

	impl Driver {
		fn assert_events(&mut self, expected: &[ConnectionEvent]) {
			let actual: Vec<_> = std::iter::from_fn(|| self.poll_event()).collect();
			assert_eq!(actual, expected);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn timer_follows_connection() {
		let (mut driver, _) = driver(DriverConfig::default());
		assert!(!driver.is_polling());

		connect(&mut driver);
		assert!(driver.is_polling());
		driver.assert_events(&[ConnectionEvent::Connected]);

		driver.handle(TransportEvent::State(TransportState::Unconnected));
		assert!(!driver.is_polling());
		driver.assert_events(&[ConnectionEvent::Disconnected]);

		// Still wanted, so the next turn reconnects.
		assert!(driver.run_scheduled());
		driver.handle(TransportEvent::State(TransportState::Connected));
		assert!(driver.is_polling());
		driver.assert_events(&[ConnectionEvent::Connected]);

		driver.disconnect();
		assert!(!driver.is_polling());
		driver.assert_events(&[ConnectionEvent::Disconnected]);
	}

	#[tokio::test(start_paused = true)]
	async fn toggles_never_overlap() {
		let (mut driver, _) = driver(DriverConfig::default());

		for _ in 0..5 {
			connect(&mut driver);
			driver.disconnect();
			driver.handle(TransportEvent::State(TransportState::Closing));
			driver.handle(TransportEvent::State(TransportState::Unconnected));
			assert!(!driver.is_polling());
		}

		let stats = driver.stats();
		assert_eq!(stats.timer_starts, 5);
		assert_eq!(stats.timer_stops, 5);
	}

	#[tokio::test(start_paused = true)]
	async fn applies_sample_with_correction() {
		let (mut driver, sink) = driver(DriverConfig::default());
		connect(&mut driver);

		send(&mut driver, Orientation::new(10.0, -5.0, 0.0));
		assert_eq!(driver.next_timer().await, Timer::Poll);
		driver.on_timer(Timer::Poll);

		let updates = sink.updates();
		assert_eq!(updates.len(), 2);
		assert_eq!(
			updates[0],
			(
				Viewpoint {
					yaw: 10.0,
					pitch: -5.0,
					roll: 0.0,
					field_of_view: 80.0
				},
				true
			)
		);

		let (correction, absolute) = updates[1];
		assert!(absolute);
		assert!((correction.yaw - 10.0).abs() <= REDRAW_EPSILON);
		assert_eq!(correction.pitch, -5.0);
		assert_eq!(correction.roll, 0.0);

		// Nothing new, nothing applied.
		driver.tick();
		assert_eq!(sink.updates().len(), 2);
		assert_eq!(driver.stats().ticks, 2);
		assert_eq!(driver.stats().applied, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn correction_never_drifts() {
		let (mut driver, sink) = driver(DriverConfig::default());

		// Before any sample, the correction is relative to the zero orientation.
		driver.resize(1920, 1080);
		driver.resize(1280, 720);
		driver.resize(640, 480);

		let viewpoints = sink.viewpoints();
		assert_eq!(viewpoints.len(), 3);
		for viewpoint in viewpoints {
			assert_eq!(viewpoint.yaw, REDRAW_EPSILON);
			assert_eq!(viewpoint.pitch, 0.0);
		}
		assert_eq!(driver.current(), Orientation::default());
	}

	#[tokio::test(start_paused = true)]
	async fn sink_error_skips_correction() {
		let (mut driver, sink) = driver(DriverConfig::default());
		connect(&mut driver);
		sink.set_status(-1);

		send(&mut driver, Orientation::new(1.0, 2.0, 3.0));
		driver.tick();

		assert_eq!(sink.updates().len(), 1);
		assert_eq!(driver.stats().sink_errors, 1);
		assert!(driver.is_polling());

		sink.set_status(0);
		send(&mut driver, Orientation::new(4.0, 5.0, 6.0));
		driver.tick();
		assert_eq!(sink.updates().len(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn no_updates_after_disconnect() {
		let (mut driver, sink) = driver(DriverConfig::default());
		connect(&mut driver);

		send(&mut driver, Orientation::new(1.0, 2.0, 3.0));
		driver.disconnect();
		driver.tick();

		assert!(sink.updates().is_empty());
		assert!(driver.next_timer().now_or_never().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn invert() {
		let config = DriverConfig {
			invert: true,
			..Default::default()
		};
		let (mut driver, sink) = driver(config);
		connect(&mut driver);

		send(&mut driver, Orientation::new(10.0, -5.0, 2.0));
		driver.tick();

		let viewpoints = sink.viewpoints();
		assert_eq!(viewpoints[0].yaw, -10.0);
		assert_eq!(viewpoints[0].pitch, 5.0);
		assert_eq!(viewpoints[0].roll, -2.0);
		assert!((viewpoints[1].yaw + 10.0).abs() <= REDRAW_EPSILON);

		// The stored sample is the real one.
		assert_eq!(driver.current(), Orientation::new(10.0, -5.0, 2.0));
	}

	#[tokio::test(start_paused = true)]
	async fn period_from_frame_rate() {
		let (mut driver, sink) = driver(DriverConfig::default());
		assert_eq!(driver.period(), Duration::from_secs_f64(1.0 / 30.0));

		sink.set_frame_rate(Some(60.0));
		assert_eq!(driver.period(), Duration::from_secs_f64(1.0 / 60.0));

		sink.set_frame_rate(Some(0.0));
		assert_eq!(driver.period(), Duration::from_secs_f64(1.0 / 30.0));

		sink.set_frame_rate(Some(MAX_FRAME_RATE));
		assert_eq!(driver.period(), Duration::from_millis(1));

		sink.set_frame_rate(Some(MIN_FRAME_RATE));
		assert_eq!(driver.period(), Duration::from_secs(1));

		sink.set_frame_rate(Some(50.0));
		connect(&mut driver);

		let start = Instant::now();
		assert_eq!(driver.next_timer().await, Timer::Poll);
		assert_eq!(start.elapsed(), Duration::from_millis(20));
	}

	#[tokio::test(start_paused = true)]
	async fn extreme_sink_frame_rate() {
		let (mut driver, sink) = driver(DriverConfig::default());
		sink.set_frame_rate(Some(1e10));
		assert_eq!(driver.period(), Duration::from_secs_f64(1.0 / 30.0));

		connect(&mut driver);
		assert!(driver.is_polling());

		let start = Instant::now();
		assert_eq!(driver.next_timer().await, Timer::Poll);
		assert!(start.elapsed() >= driver.period());
	}

	#[tokio::test(start_paused = true)]
	async fn extreme_config_frame_rate() {
		for frame_rate in [1e-20, 1e10, f64::NAN, f64::INFINITY, -30.0] {
			let config = DriverConfig {
				frame_rate,
				..Default::default()
			};
			let (mut driver, _) = driver(config);
			assert_eq!(driver.period(), Duration::from_secs_f64(1.0 / 30.0));

			connect(&mut driver);
			assert_eq!(driver.next_timer().await, Timer::Poll);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn heartbeat() {
		let config = DriverConfig {
			heartbeat: Some(Duration::from_millis(100)),
			frame_rate: MIN_FRAME_RATE,
			..Default::default()
		};
		let (mut driver, _) = driver(config);
		connect(&mut driver);

		assert_eq!(driver.next_timer().await, Timer::Heartbeat);
		driver.on_timer(Timer::Heartbeat);
		assert_eq!(driver.client().connection().transport().pings().len(), 1);

		driver.disconnect();
		assert!(driver.next_timer().now_or_never().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn zero_heartbeat_is_disabled() {
		let config = DriverConfig {
			heartbeat: Some(Duration::ZERO),
			..Default::default()
		};
		let (mut driver, _) = driver(config);
		connect(&mut driver);

		assert_eq!(driver.next_timer().await, Timer::Poll);
		assert!(driver.client().connection().transport().pings().is_empty());
	}
}
