//! HTTP wire types of the signaling relay.
//!
//! Request fields are optional so that missing fields can be reported as a
//! `BadRequest` instead of a generic deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a message submitted to or returned by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKindDto {
    Offer,
    Answer,
    Candidate,
    Disconnect,
}

impl SignalKindDto {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKindDto::Offer => "offer",
            SignalKindDto::Answer => "answer",
            SignalKindDto::Candidate => "candidate",
            SignalKindDto::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleDto {
    Host,
    Guest,
    Observer,
}

/// `POST /api/rooms`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequestDto {
    pub room_id: Option<String>,
    pub participant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponseDto {
    pub room_id: String,
    pub participants: Vec<String>,
    pub expires_in_seconds: i64,
}

/// Message part of a submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmittedMessageDto {
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// `POST /api/signal`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestDto {
    pub room_id: Option<String>,
    pub participant_id: Option<String>,
    pub message: Option<SubmittedMessageDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseDto {
    pub accepted: bool,
    pub participant_count: usize,
    pub message_count: usize,
}

/// `GET /api/signal` query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQueryDto {
    pub room_id: Option<String>,
    pub participant_id: Option<String>,
    #[serde(default)]
    pub verify: bool,
}

/// One logged setup message as seen by a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedMessageDto {
    pub kind: SignalKindDto,
    pub participant_id: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponseDto {
    pub messages: Vec<LoggedMessageDto>,
    pub is_host: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleDto>,
    pub participants: Vec<String>,
    /// `<= 0` means the room is gone
    pub expires_in_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PollResponseDto {
    /// Response for an unknown, closed or expired room
    pub fn gone(reason: &str) -> Self {
        Self {
            messages: Vec::new(),
            is_host: false,
            role: None,
            participants: Vec::new(),
            expires_in_seconds: 0,
            error: Some(reason.to_string()),
        }
    }

    pub fn is_gone(&self) -> bool {
        self.expires_in_seconds <= 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetailDto {
    pub participant_id: String,
    pub role: RoleDto,
}

/// `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub participants: Vec<ParticipantDetailDto>,
    pub message_count: usize,
    pub created_at: String,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
