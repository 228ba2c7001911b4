//! Domain layer of the signaling relay.

pub mod entity;
pub mod error;
pub mod repository;
pub mod value_object;

pub use entity::{
    AppendReceipt, MAX_ACTIVE_PARTICIPANTS, ROOM_TTL_MILLIS, Room, RoomView, SetupMessage,
    expires_in_seconds,
};
pub use error::{RepositoryError, ValueObjectError};
pub use repository::RoomRepository;
pub use value_object::{MessageKind, ParticipantId, Role, RoomId, Timestamp};
