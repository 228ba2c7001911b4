//! Last room this client took part in.
//!
//! Only used to pre-fill a manual rejoin. Nothing here triggers a new
//! negotiation on its own.

use parley_server::domain::{ROOM_TTL_MILLIS, RoomId};

use crate::domain::PeerRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberedRoom {
    pub room_id: RoomId,
    /// `None` for a spectator
    pub role: Option<PeerRole>,
    /// Unix milliseconds
    pub joined_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct RoomMemory {
    last: Option<RememberedRoom>,
}

impl RoomMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, room_id: RoomId, role: Option<PeerRole>, joined_at: i64) {
        self.last = Some(RememberedRoom {
            room_id,
            role,
            joined_at,
        });
    }

    pub fn last(&self) -> Option<&RememberedRoom> {
        self.last.as_ref()
    }

    pub fn forget(&mut self) {
        self.last = None;
    }

    /// Room id to offer for a manual rejoin, unless the room must have expired
    pub fn rejoin_suggestion(&self, now: i64) -> Option<&RoomId> {
        self.last
            .as_ref()
            .filter(|room| now - room.joined_at < ROOM_TTL_MILLIS)
            .map(|room| &room.room_id)
    }
}
