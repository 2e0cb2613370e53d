//! Helper library for native SeeVR players.
//!
//! Connects a [seevr_orient::Player] to a head tracker over WebSocket (via
//! [tokio-tungstenite](https://crates.io/crates/tokio-tungstenite)).
//!
//! Includes optional logging and configuration, plus a [Publisher] that imitates a tracker for local testing.

pub mod client;
pub mod log;
pub mod publish;
pub mod websocket;

pub use client::*;
pub use log::*;
pub use publish::*;
pub use websocket::*;

// Re-export these crates.
pub use seevr_orient;
pub use tokio_tungstenite;
