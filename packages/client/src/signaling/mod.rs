//! Access to the signaling relay.

mod http;

pub use http::HttpSignalingClient;

use async_trait::async_trait;
use parley_server::infrastructure::dto::http::{
    CreateRoomResponseDto, PollResponseDto, SubmitRequestDto, SubmitResponseDto,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl SignalingError {
    /// Transport-level failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            SignalingError::Network(_) => true,
            SignalingError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Relay operations used during negotiation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingApi: Send + Sync {
    /// Create `room_id` with `participant_id` as host
    async fn create_room(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<CreateRoomResponseDto, SignalingError>;

    async fn submit(&self, request: &SubmitRequestDto)
    -> Result<SubmitResponseDto, SignalingError>;

    /// Read the messages visible to `participant_id`; `verify` returns the whole log
    async fn poll(
        &self,
        room_id: &str,
        participant_id: &str,
        verify: bool,
    ) -> Result<PollResponseDto, SignalingError>;
}
