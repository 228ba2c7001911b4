//! Peer client for the Parley signaling relay.
//!
//! Two browsers-worth of logic without the browser: negotiation of a direct
//! channel through the relay, then a small game protocol over that channel.

pub mod config;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod peer;
pub mod retry;
pub mod room_memory;
pub mod rules;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::ClientConfig;
pub use error::ClientError;
pub use peer::{JoinOutcome, PeerClient};
