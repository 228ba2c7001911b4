//! Value objects of the relay domain.

use std::fmt;

use rand::{Rng, distributions::Uniform};

use super::error::ValueObjectError;

/// Maximum length of a room or participant identifier
pub const MAX_ID_LENGTH: usize = 64;

const GENERATED_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const GENERATED_ROOM_ID_LENGTH: usize = 6;
const GENERATED_PARTICIPANT_ID_LENGTH: usize = 7;

fn validate_id(value: &str) -> Result<(), ValueObjectError> {
    if value.is_empty() {
        return Err(ValueObjectError::Empty);
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(ValueObjectError::TooLong {
            max: MAX_ID_LENGTH,
            actual: value.len(),
        });
    }
    if let Some(ch) = value
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
    {
        return Err(ValueObjectError::InvalidCharacter(ch));
    }
    Ok(())
}

fn random_token(length: usize) -> String {
    let index = Uniform::from(0..GENERATED_ID_ALPHABET.len());
    rand::thread_rng()
        .sample_iter(index)
        .take(length)
        .map(|i| GENERATED_ID_ALPHABET[i] as char)
        .collect()
}

/// Short random token naming a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id(&value)?;
        Ok(Self(value))
    }

    /// Generate a fresh 6-character lowercase alphanumeric room id
    pub fn generate() -> Self {
        Self(random_token(GENERATED_ROOM_ID_LENGTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-session random token identifying a participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id(&value)?;
        Ok(Self(value))
    }

    pub fn generate() -> Self {
        Self(random_token(GENERATED_PARTICIPANT_ID_LENGTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Kind of a setup message stored in a room's log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Offer,
    Answer,
    Candidate,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Offer => "offer",
            MessageKind::Answer => "answer",
            MessageKind::Candidate => "candidate",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a participant, derived from join order.
///
/// participant[0] is the host, participant[1] the guest, anyone else an observer.
/// The role is never stored; it is recomputed from the participant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Host,
    Guest,
    Observer,
}

impl Role {
    /// Role implied by a position in the participant list
    pub fn from_position(position: usize) -> Self {
        match position {
            0 => Role::Host,
            1 => Role::Guest,
            _ => Role::Observer,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Role::Observer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Host => "host",
            Role::Guest => "guest",
            Role::Observer => "observer",
        })
    }
}
