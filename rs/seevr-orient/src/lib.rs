//! # seevr-orient: head orientation for 360° video
//!
//! `seevr-orient` keeps a connection to a remote head tracker open and steers the viewpoint of a 360° video with it.
//!
//! The tracker sends unframed binary messages, each exactly three little-endian doubles:
//! `[yaw, pitch, roll]` in degrees.
//! Only the newest sample matters; there's no queue, and a sample identical to the last one applied is ignored.
//!
//! ## API
//!
//! From the wire up:
//! - [RawSample] and [Orientation]: the message format.
//! - [Transport]: the socket, reporting back through [TransportEvent]s. See `seevr-native` for a WebSocket one.
//! - [Connection]: reconnects immediately whenever the link drops, until [Connection::disconnect] is called.
//! - [OrientationClient]: buffers the newest sample in a [SampleSlot].
//! - [ViewpointDriver]: polls the client at the video frame rate and applies samples to a [VideoSink].
//! - [Player]: runs a driver on a tokio task.
//!
//! Only [Player] spawns a task; everything else is driven by whoever owns it.
//! A tokio runtime is required once the driver starts its timers.

mod client;
mod codec;
mod connection;
mod driver;
mod error;
mod player;
mod sink;
mod slot;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::*;
pub use codec::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use player::*;
pub use sink::*;
pub use slot::*;
pub use transport::*;

// Re-export these crates.
pub use bytes;
pub use url;
