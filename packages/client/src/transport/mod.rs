//! Peer transport capability.
//!
//! The platform's connection primitives (description creation, candidate
//! gathering, the data channel) sit behind [`PeerTransport`]. Asynchronous
//! notifications arrive on the `TransportEvent` channel handed out with the
//! transport.

mod memory;

pub use memory::{MemoryNetwork, MemoryTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Opaque session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// Offer as posted to the relay: the description plus the host's colour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    #[serde(flatten)]
    pub description: SessionDescription,
    pub host_color: Color,
}

/// Opaque network candidate descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

/// Data channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    pub label: &'static str,
    pub protocol: &'static str,
    pub ordered: bool,
    /// `Some(0)`: a dropped message is never retransmitted
    pub max_retransmits: Option<u16>,
    /// STUN servers handed to the platform's connection
    pub ice_servers: &'static [&'static str],
}

pub const PUBLIC_STUN_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

/// Ordered, fire-and-forget channel used for game envelopes
pub const GAME_CHANNEL: ChannelOptions = ChannelOptions {
    label: "game",
    protocol: "json",
    ordered: true,
    max_retransmits: Some(0),
    ice_servers: PUBLIC_STUN_SERVERS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Locally gathered candidate to forward to the peer
    LocalCandidate(IceCandidate),
    GatheringComplete,
    IceConnected,
    IceFailed,
    ChannelOpen,
    ChannelClosed,
    /// Text received on the channel
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("channel is not open")]
    ChannelNotOpen,

    #[error("no local description has been created")]
    NoLocalDescription,

    #[error("no remote description has been applied")]
    NoRemoteDescription,

    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error("transport is closed")]
    Closed,

    #[error("transport failure: {0}")]
    Failed(String),
}

#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create the data channel (host side; the guest receives it)
    async fn open_channel(&self, options: ChannelOptions) -> Result<(), TransportError>;

    /// Create and apply the local offer. Candidate gathering starts.
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    /// Create and apply the local answer to the applied remote offer
    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn apply_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Requires an applied remote description
    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Resolve once local candidate gathering has finished
    async fn wait_for_gathering(&self) -> Result<(), TransportError>;

    async fn restart_ice(&self) -> Result<(), TransportError>;

    async fn send(&self, text: String) -> Result<(), TransportError>;

    async fn close(&self);
}
