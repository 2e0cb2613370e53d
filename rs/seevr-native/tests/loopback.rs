use std::time::Duration;

use seevr_native::{ClientConfig, Publisher};
use seevr_orient::mock::RecordingSink;
use seevr_orient::{ConnectionEvent, Orientation, Viewpoint};
use tokio::sync::{broadcast, watch};
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(10);

async fn wait_event(events: &mut broadcast::Receiver<ConnectionEvent>) -> ConnectionEvent {
	tokio::time::timeout(TIMEOUT, events.recv())
		.await
		.expect("timed out waiting for event")
		.expect("event channel closed")
}

async fn wait_for(sink: &RecordingSink, check: impl Fn(&[Viewpoint]) -> bool) {
	tokio::time::timeout(TIMEOUT, async {
		while !check(&sink.viewpoints()) {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.expect("timed out waiting for viewpoint");
}

fn config(url: Url) -> ClientConfig {
	let mut config = ClientConfig::default();
	config.url = Some(url);
	config
}

#[tokio::test]
async fn streams_orientation() {
	let (orientation, orientation_rx) = watch::channel(Orientation::new(10.0, -5.0, 0.0));

	let publisher = Publisher::bind("127.0.0.1:0".parse().unwrap(), orientation_rx)
		.await
		.unwrap();
	let addr = publisher.local_addr().unwrap();
	let server = tokio::spawn(publisher.run());

	let client = config(Url::parse(&format!("ws://{addr}/")).unwrap()).init().unwrap();
	let sink = RecordingSink::default();
	let player = client.player(sink.clone());
	let mut events = player.subscribe();

	assert_eq!(wait_event(&mut events).await, ConnectionEvent::Connected);

	wait_for(&sink, |viewpoints| !viewpoints.is_empty()).await;
	let first = sink.updates()[0];
	assert_eq!(
		first.0,
		Viewpoint {
			yaw: 10.0,
			pitch: -5.0,
			roll: 0.0,
			field_of_view: 80.0,
		}
	);
	assert!(first.1);

	orientation.send(Orientation::new(20.0, 1.0, 2.0)).unwrap();
	wait_for(&sink, |viewpoints| viewpoints.iter().any(|viewpoint| viewpoint.yaw == 20.0)).await;

	let driver = player.shutdown().await.unwrap();
	assert!(!driver.is_polling());
	assert_eq!(driver.stats().applied, 2);
	assert_eq!(driver.client().stats().malformed, 0);

	server.abort();
}

#[tokio::test]
async fn reconnects_after_drop() {
	let sample = Orientation::new(45.0, 0.0, 0.0);
	let (_orientation, orientation_rx) = watch::channel(sample);

	let publisher = Publisher::bind("127.0.0.1:0".parse().unwrap(), orientation_rx.clone())
		.await
		.unwrap();
	let addr = publisher.local_addr().unwrap();
	let server = tokio::spawn(publisher.run());

	let client = config(Url::parse(&format!("ws://{addr}/")).unwrap()).init().unwrap();
	let sink = RecordingSink::default();
	let player = client.player(sink.clone());
	let mut events = player.subscribe();

	assert_eq!(wait_event(&mut events).await, ConnectionEvent::Connected);
	wait_for(&sink, |viewpoints| !viewpoints.is_empty()).await;

	// Kill the server and every connection with it.
	server.abort();
	assert_eq!(wait_event(&mut events).await, ConnectionEvent::Disconnected);

	let publisher = Publisher::bind(addr, orientation_rx).await.unwrap();
	let server = tokio::spawn(publisher.run());
	assert_eq!(wait_event(&mut events).await, ConnectionEvent::Connected);

	// The new server sends the same sample again, which is not applied twice.
	let applied = sink.updates().len();
	tokio::time::sleep(Duration::from_millis(200)).await;
	assert_eq!(sink.updates().len(), applied);

	let driver = player.shutdown().await.unwrap();
	assert_eq!(driver.stats().applied, 1);
	assert_eq!(driver.stats().timer_starts, 2);
	assert!(driver.client().connection().attempts() >= 2);

	server.abort();
}
