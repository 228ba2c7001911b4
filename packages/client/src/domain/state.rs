//! Per-client connection state machine.
//!
//! ```text
//! idle -> negotiating -> awaiting-remote-description -> gathering-candidates
//!      -> channel-connecting | channel-open -> established
//! any -> failed -> negotiating (ICE restart)
//! any -> closed
//! ```
//!
//! The guest skips `awaiting-remote-description`: it applies the offer while
//! still negotiating.

use std::fmt;

/// Negotiating side. Observers never negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRole {
    Host,
    Guest,
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PeerRole::Host => "host",
            PeerRole::Guest => "guest",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Negotiating(PeerRole),
    AwaitingRemoteDescription,
    GatheringCandidates,
    /// Network path is up, channel not yet open
    ChannelConnecting,
    /// Channel is open, network readiness not yet reported
    ChannelOpen,
    Established,
    Failed(PeerRole),
    Closed,
}

/// What happened to move the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Begin(PeerRole),
    /// Host's offer was stored by the relay
    OfferSent,
    RemoteDescriptionApplied,
    IceConnected,
    ChannelOpened,
    /// ICE or channel failure, tagged with the local side
    ConnectionFailed(PeerRole),
    IceRestarted,
    Close,
}

impl ConnectionState {
    /// Next state, or `None` if `trigger` is not valid here
    pub fn next(self, trigger: Trigger) -> Option<ConnectionState> {
        use ConnectionState::*;

        match (self, trigger) {
            (Closed, _) => None,
            (_, Trigger::Close) => Some(Closed),

            (Idle, Trigger::Begin(role)) => Some(Negotiating(role)),
            (Negotiating(PeerRole::Host), Trigger::OfferSent) => Some(AwaitingRemoteDescription),
            (AwaitingRemoteDescription, Trigger::RemoteDescriptionApplied) => {
                Some(GatheringCandidates)
            }
            (Negotiating(PeerRole::Guest), Trigger::RemoteDescriptionApplied) => {
                Some(GatheringCandidates)
            }

            (GatheringCandidates, Trigger::IceConnected) => Some(ChannelConnecting),
            (GatheringCandidates, Trigger::ChannelOpened) => Some(ChannelOpen),
            (ChannelConnecting, Trigger::ChannelOpened) => Some(Established),
            (ChannelOpen, Trigger::IceConnected) => Some(Established),
            // After an ICE restart the channel may still be open
            (Negotiating(_), Trigger::IceConnected) => Some(ChannelConnecting),

            (Idle | Failed(_), Trigger::ConnectionFailed(_)) => None,
            (_, Trigger::ConnectionFailed(role)) => Some(Failed(role)),
            (Failed(role), Trigger::IceRestarted) => Some(Negotiating(role)),

            _ => None,
        }
    }

    pub fn is_established(&self) -> bool {
        matches!(self, ConnectionState::Established)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => f.write_str("idle"),
            ConnectionState::Negotiating(role) => write!(f, "negotiating({role})"),
            ConnectionState::AwaitingRemoteDescription => f.write_str("awaiting-remote-description"),
            ConnectionState::GatheringCandidates => f.write_str("gathering-candidates"),
            ConnectionState::ChannelConnecting => f.write_str("channel-connecting"),
            ConnectionState::ChannelOpen => f.write_str("channel-open"),
            ConnectionState::Established => f.write_str("established"),
            ConnectionState::Failed(role) => write!(f, "failed({role})"),
            ConnectionState::Closed => f.write_str("closed"),
        }
    }
}
