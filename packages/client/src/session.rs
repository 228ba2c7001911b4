//! Session protocol spoken over the open game channel.
//!
//! Incoming envelopes are dispatched by kind to the registered
//! [`SessionEvents`] handler. The host is authoritative for clocks and for
//! the colour assignment; a guest never sends either.

use thiserror::Error;

use crate::{
    domain::{Clocks, Color, Envelope, PeerRole, Square},
    rules::{MoveResult, RulesEngine},
};

/// Reportable conditions that do not end the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionWarning {
    /// A peer move failed local legality; the boards have diverged
    ProtocolDesync { from: Square, to: Square },
    /// The relay room expires soon
    RoomExpiring { seconds_left: i64 },
    /// `game-start` announced a colour mapping other than the one derived from the offer
    ColorMismatch { derived: Color, announced: Color },
    /// The channel closed without a `disconnect`
    PeerLost,
}

/// Callbacks for the envelope kinds plus warnings. All methods default to no-ops.
pub trait SessionEvents: Send {
    fn on_move(&mut self, _result: &MoveResult) {}
    fn on_chat(&mut self, _text: &str, _sender: Option<Color>, _timestamp: i64) {}
    fn on_clock_sync(&mut self, _clocks: Clocks) {}
    fn on_game_start(&mut self, _host_color: Color) {}
    fn on_handshake_complete(&mut self) {}
    fn on_peer_disconnect(&mut self) {}
    fn on_warning(&mut self, _warning: &SessionWarning) {}
}

/// Handler that ignores everything
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("channel is not ready")]
    ChannelNotReady,

    #[error("only the host may send {0}")]
    NotAuthoritative(&'static str),

    #[error("illegal move {from}-{to}")]
    IllegalMove { from: Square, to: Square },

    /// `game-start` repeated, or announcing a colour other than our own
    #[error("game-start rejected: {0}")]
    InvalidGameStart(&'static str),

    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

/// Result of handling one incoming envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Continue,
    /// The peer sent `disconnect`; tear down now
    PeerDisconnected,
}

pub struct SessionProtocol {
    role: Option<PeerRole>,
    color: Option<Color>,
    clocks: Clocks,
    game_started: bool,
    handshake_seen: bool,
    rules: Box<dyn RulesEngine>,
    handlers: Box<dyn SessionEvents>,
}

impl SessionProtocol {
    pub fn new(rules: Box<dyn RulesEngine>) -> Self {
        Self {
            role: None,
            color: None,
            clocks: Clocks::default(),
            game_started: false,
            handshake_seen: false,
            rules,
            handlers: Box::new(NoopEvents),
        }
    }

    /// Replace the callback handler (the single registration point)
    pub fn set_handlers(&mut self, handlers: Box<dyn SessionEvents>) {
        self.handlers = handlers;
    }

    pub fn assign(&mut self, role: PeerRole, color: Color) {
        self.role = Some(role);
        self.color = Some(color);
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn clocks(&self) -> Clocks {
        self.clocks
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn rules(&self) -> &dyn RulesEngine {
        self.rules.as_ref()
    }

    fn is_host(&self) -> bool {
        self.role == Some(PeerRole::Host)
    }

    pub fn warn(&mut self, warning: SessionWarning) {
        tracing::warn!("Session warning: {:?}", warning);
        self.handlers.on_warning(&warning);
    }

    pub fn notify_peer_disconnect(&mut self) {
        self.handlers.on_peer_disconnect();
    }

    /// Validate and apply an envelope we are about to send, and encode it
    pub fn prepare_outgoing(&mut self, envelope: &Envelope) -> Result<String, SessionError> {
        match envelope {
            Envelope::ClockSync {
                time_white,
                time_black,
            } => {
                if !self.is_host() {
                    return Err(SessionError::NotAuthoritative("clock-sync"));
                }
                self.clocks = Clocks {
                    white: *time_white,
                    black: *time_black,
                };
            }
            Envelope::GameStart { host_color } => {
                if !self.is_host() {
                    return Err(SessionError::NotAuthoritative("game-start"));
                }
                if self.game_started {
                    return Err(SessionError::InvalidGameStart("already sent"));
                }
                if self.color != Some(*host_color) {
                    return Err(SessionError::InvalidGameStart("colour differs from the offer"));
                }
                // The host's own game-start callback fires on send
                self.game_started = true;
                self.handlers.on_game_start(*host_color);
            }
            Envelope::Move { from, to } => {
                if self.rules.apply_move(*from, *to).is_none() {
                    return Err(SessionError::IllegalMove {
                        from: *from,
                        to: *to,
                    });
                }
            }
            Envelope::Chat { .. } | Envelope::HandshakeComplete | Envelope::Disconnect => {}
        }
        envelope
            .to_json()
            .map_err(|e| SessionError::Encode(e.to_string()))
    }

    /// Decode and dispatch one message received on the channel
    pub fn handle_incoming(&mut self, text: &str) -> Inbound {
        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Dropped undecodable envelope: {}", e);
                return Inbound::Continue;
            }
        };
        tracing::debug!("Received {} envelope", envelope.kind());

        match envelope {
            Envelope::Move { from, to } => match self.rules.apply_move(from, to) {
                Some(result) => self.handlers.on_move(&result),
                None => self.warn(SessionWarning::ProtocolDesync { from, to }),
            },
            Envelope::Chat {
                text,
                sender,
                timestamp,
            } => self.handlers.on_chat(&text, sender, timestamp),
            Envelope::ClockSync {
                time_white,
                time_black,
            } => {
                if self.is_host() {
                    tracing::debug!("Ignored clock-sync from guest");
                } else {
                    // Last write wins
                    self.clocks = Clocks {
                        white: time_white,
                        black: time_black,
                    };
                    self.handlers.on_clock_sync(self.clocks);
                }
            }
            Envelope::GameStart { host_color } => {
                if self.is_host() {
                    tracing::debug!("Ignored game-start from guest");
                } else {
                    let derived = host_color.opposite();
                    if let Some(own) = self.color.filter(|own| *own != derived) {
                        self.warn(SessionWarning::ColorMismatch {
                            derived: own,
                            announced: host_color,
                        });
                    }
                    self.color = Some(derived);
                    self.game_started = true;
                    self.handlers.on_game_start(host_color);
                }
            }
            Envelope::HandshakeComplete => {
                if !self.handshake_seen {
                    self.handshake_seen = true;
                    self.handlers.on_handshake_complete();
                }
            }
            Envelope::Disconnect => {
                self.notify_peer_disconnect();
                return Inbound::PeerDisconnected;
            }
        }
        Inbound::Continue
    }
}
