//! Room entity and the setup messages it logs.
//!
//! A room is the relay's only state: an insertion-ordered participant list and
//! an append-only log of session-setup messages. The host is always
//! `participants[0]`; roles are derived from position (see [`Role`]) and never
//! stored.

use serde_json::Value;

use super::value_object::{MessageKind, ParticipantId, Role, RoomId, Timestamp};

/// Lifetime of a room, measured from its creation (20 minutes)
pub const ROOM_TTL_MILLIS: i64 = 20 * 60 * 1000;

/// Number of participants that may take part in negotiation
pub const MAX_ACTIVE_PARTICIPANTS: usize = 2;

/// One entry of a room's setup log
#[derive(Debug, Clone, PartialEq)]
pub struct SetupMessage {
    pub kind: MessageKind,
    pub from: ParticipantId,
    /// Opaque session description or candidate descriptor
    pub payload: Value,
}

impl SetupMessage {
    pub fn new(kind: MessageKind, from: ParticipantId, payload: Value) -> Self {
        Self {
            kind,
            from,
            payload,
        }
    }
}

/// Result of appending to a room's log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Whether the message was stored (observers are never stored)
    pub accepted: bool,
    pub role: Role,
    pub participant_count: usize,
    pub message_count: usize,
}

/// What a participant sees when reading a room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomView {
    pub role: Role,
    pub messages: Vec<SetupMessage>,
    pub participants: Vec<ParticipantId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub participants: Vec<ParticipantId>,
    pub messages: Vec<SetupMessage>,
    pub created_at: Timestamp,
    /// Set once an active participant relays a disconnect; the next sweep drops the room
    pub closed: bool,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            participants: Vec::new(),
            messages: Vec::new(),
            created_at,
            closed: false,
        }
    }

    /// Role of `participant` without registering it
    pub fn role_of(&self, participant: &ParticipantId) -> Role {
        self.participants
            .iter()
            .position(|p| p == participant)
            .map(Role::from_position)
            .unwrap_or(Role::Observer)
    }

    /// Register `participant` if it is new and a seat is free, and return its role.
    ///
    /// Participants beyond the active cap are observers and leave the room untouched.
    pub fn register(&mut self, participant: &ParticipantId) -> Role {
        if let Some(position) = self.participants.iter().position(|p| p == participant) {
            return Role::from_position(position);
        }
        if self.participants.len() >= MAX_ACTIVE_PARTICIPANTS {
            return Role::Observer;
        }
        self.participants.push(participant.clone());
        Role::from_position(self.participants.len() - 1)
    }

    pub fn host(&self) -> Option<&ParticipantId> {
        self.participants.first()
    }

    /// Register the author and append its message unless it is an observer
    pub fn append(&mut self, message: SetupMessage) -> AppendReceipt {
        let role = self.register(&message.from);
        let accepted = role.is_active();
        if accepted {
            self.messages.push(message);
        }
        AppendReceipt {
            accepted,
            role,
            participant_count: self.participants.len(),
            message_count: self.messages.len(),
        }
    }

    /// Messages `reader` is allowed to receive.
    ///
    /// The host gets everything it did not author, a guest gets only the host's
    /// messages and an observer gets nothing. `verify` returns the whole log to
    /// an active participant so it can check its own submission was stored.
    pub fn visible_messages(&self, reader: &ParticipantId, verify: bool) -> Vec<SetupMessage> {
        let role = self.role_of(reader);
        if !role.is_active() {
            return Vec::new();
        }
        if verify {
            return self.messages.clone();
        }
        let host = match self.host() {
            Some(host) => host,
            None => return Vec::new(),
        };
        self.messages
            .iter()
            .filter(|m| match role {
                Role::Host => &m.from != reader,
                Role::Guest => &m.from == host,
                Role::Observer => false,
            })
            .cloned()
            .collect()
    }

    /// Register `reader` and return its filtered view of the room
    pub fn read(&mut self, reader: &ParticipantId, verify: bool) -> RoomView {
        let role = self.register(reader);
        RoomView {
            role,
            messages: self.visible_messages(reader, verify),
            participants: self.participants.clone(),
            created_at: self.created_at,
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.value() - self.created_at.value() >= ROOM_TTL_MILLIS
    }

    /// Whether the store should drop this room on its next sweep
    pub fn is_gone(&self, now: Timestamp) -> bool {
        self.closed || self.is_expired(now)
    }
}

/// Whole seconds left before a room created at `created_at` expires, rounded up.
///
/// Any remaining fraction of a second counts as one; `<= 0` means gone.
pub fn expires_in_seconds(created_at: Timestamp, now: Timestamp) -> i64 {
    let remaining = ROOM_TTL_MILLIS - (now.value() - created_at.value());
    if remaining <= 0 {
        0
    } else {
        (remaining + 999) / 1000
    }
}
