use std::net;
use std::time::Duration;

use anyhow::Context;
use seevr_native::Publisher;
use seevr_native::seevr_orient::Orientation;
use tokio::sync::watch;
use tokio::time::Instant;

/// Imitate a head tracker.
#[derive(clap::Args, Clone, Debug)]
pub struct Args {
	/// Listen for WebSocket clients on this address.
	#[arg(long, default_value = "[::]:8080", env = "SEEVR_PUBLISH_BIND")]
	pub bind: net::SocketAddr,

	/// Samples sent per second.
	#[arg(long, default_value_t = 30.0)]
	pub rate: f64,

	/// Yaw rotation speed, in degrees per second.
	#[arg(long, default_value_t = 20.0)]
	pub speed: f64,

	/// Pitch amplitude of the nodding motion, in degrees.
	#[arg(long, default_value_t = 10.0)]
	pub nod: f64,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
	anyhow::ensure!(args.rate.is_finite() && args.rate > 0.0, "rate must be positive");

	let (orientation, orientation_rx) = watch::channel(Orientation::default());
	let publisher = Publisher::bind(args.bind, orientation_rx).await?;

	tokio::select! {
		res = publisher.run() => res,
		_ = rotate(orientation, &args) => Ok(()),
		res = tokio::signal::ctrl_c() => res.context("failed to listen for ctrl-c"),
	}
}

async fn rotate(orientation: watch::Sender<Orientation>, args: &Args) {
	let start = Instant::now();
	let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / args.rate));

	loop {
		interval.tick().await;
		let elapsed = start.elapsed().as_secs_f64();
		orientation.send_replace(orientation_at(elapsed, args.speed, args.nod));
	}
}

// Yaw sweeps around the circle while the head nods every four seconds.
fn orientation_at(elapsed: f64, speed: f64, nod: f64) -> Orientation {
	let yaw = (elapsed * speed) % 360.0;
	let pitch = nod * (elapsed * std::f64::consts::TAU / 4.0).sin();
	Orientation::new(yaw, pitch, 0.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_orientation_at() {
		assert_eq!(orientation_at(0.0, 20.0, 10.0), Orientation::new(0.0, 0.0, 0.0));
		assert_eq!(orientation_at(9.0, 20.0, 0.0).yaw, 180.0);
		assert_eq!(orientation_at(18.0, 20.0, 0.0).yaw, 0.0);

		let peak = orientation_at(1.0, 0.0, 10.0);
		assert!((peak.pitch - 10.0).abs() < 1e-9);
	}
}
