use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::Instrument;
use url::Url;

use crate::{ConnectionEvent, Error, Result, Transport, TransportEvent, VideoSink, ViewpointDriver};

enum Command {
	Connect(Url),
	Disconnect,
	Resize { width: u32, height: u32 },
	Ping,
	Shutdown,
}

/// A handle to a [ViewpointDriver] running on its own task.
///
/// The task is the only place the driver is touched.
/// Transport events, timer ticks and commands from this handle are handled one at a time, each to completion.
pub struct Player<T, S> {
	commands: mpsc::UnboundedSender<Command>,
	events: broadcast::Sender<ConnectionEvent>,
	task: Option<JoinHandle<ViewpointDriver<T, S>>>,
}

impl<T, S> Player<T, S>
where
	T: Transport + Send + 'static,
	S: VideoSink + Send + 'static,
{
	/// Spawn the dispatcher, reading transport events from the given channel.
	pub fn spawn(driver: ViewpointDriver<T, S>, transport: mpsc::UnboundedReceiver<TransportEvent>) -> Self {
		let (commands, commands_rx) = mpsc::unbounded_channel();
		let (events, _) = broadcast::channel(16);

		let dispatcher = Dispatcher {
			driver,
			commands: commands_rx,
			transport,
			events: events.clone(),
		};

		let task = tokio::spawn(dispatcher.run().in_current_span());

		Self {
			commands,
			events,
			task: Some(task),
		}
	}

	pub fn connect(&self, url: Url) {
		self.send(Command::Connect(url));
	}

	pub fn disconnect(&self) {
		self.send(Command::Disconnect);
	}

	/// Tell the driver the playback surface changed size.
	pub fn resize(&self, width: u32, height: u32) {
		self.send(Command::Resize { width, height });
	}

	/// Probe the connection now, outside any configured heartbeat.
	pub fn ping(&self) {
		self.send(Command::Ping);
	}

	/// Receive [ConnectionEvent]s emitted after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
		self.events.subscribe()
	}

	/// Disconnect, stop the dispatcher, and hand back the driver.
	pub async fn shutdown(mut self) -> Result<ViewpointDriver<T, S>> {
		self.send(Command::Shutdown);

		let task = self.task.take().ok_or(Error::Closed)?;
		task.await.map_err(|_| Error::Closed)
	}

	fn send(&self, command: Command) {
		if self.commands.send(command).is_err() {
			tracing::warn!("player is closed");
		}
	}
}

impl<T, S> Drop for Player<T, S> {
	fn drop(&mut self) {
		if self.task.is_some() {
			let _ = self.commands.send(Command::Shutdown);
		}
	}
}

struct Dispatcher<T, S> {
	driver: ViewpointDriver<T, S>,
	commands: mpsc::UnboundedReceiver<Command>,
	transport: mpsc::UnboundedReceiver<TransportEvent>,
	events: broadcast::Sender<ConnectionEvent>,
}

impl<T: Transport, S: VideoSink> Dispatcher<T, S> {
	async fn run(mut self) -> ViewpointDriver<T, S> {
		loop {
			// Attempts scheduled by the previous handler run here, on their own turn.
			self.driver.run_scheduled();
			self.forward();

			tokio::select! {
				command = self.commands.recv() => match command {
					Some(Command::Connect(url)) => self.driver.connect(url),
					Some(Command::Disconnect) => self.driver.disconnect(),
					Some(Command::Resize { width, height }) => self.driver.resize(width, height),
					Some(Command::Ping) => self.driver.ping(),
					Some(Command::Shutdown) | None => break,
				},
				Some(event) = self.transport.recv() => self.driver.handle(event),
				timer = self.driver.next_timer() => self.driver.on_timer(timer),
			}
		}

		self.driver.shutdown();
		self.forward();

		self.driver
	}

	fn forward(&mut self) {
		while let Some(event) = self.driver.poll_event() {
			// Nobody listening is fine.
			let _ = self.events.send(event);
		}
	}
}
