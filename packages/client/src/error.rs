//! Error types for the peer client.

use thiserror::Error;

use crate::{
    domain::ConnectionState, session::SessionError, signaling::SignalingError,
    transport::TransportError,
};

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay rejected a submission as malformed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The room is unknown, expired or closed
    #[error("room is gone")]
    RoomGone,

    /// The guest found no offer within its discovery budget
    #[error("no offer found after {attempts} attempts")]
    NoOfferFound { attempts: u32 },

    /// The host's offer was not in the log on read-back
    #[error("offer was not stored by the relay")]
    OfferNotStored,

    #[error("invalid offer: {0}")]
    InvalidOffer(String),

    /// The connection failed and could not be restarted
    #[error("channel failure: {0}")]
    ChannelFailure(String),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    #[error("signaling error: {0}")]
    Signaling(SignalingError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl From<SignalingError> for ClientError {
    fn from(e: SignalingError) -> Self {
        match e {
            SignalingError::BadRequest(details) => ClientError::BadRequest(details),
            SignalingError::NotFound(_) => ClientError::RoomGone,
            other => ClientError::Signaling(other),
        }
    }
}
