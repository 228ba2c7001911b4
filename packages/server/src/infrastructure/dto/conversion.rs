//! Conversion logic between DTOs and domain values.

use crate::domain::{MessageKind, ParticipantId, Role, RoomId, SetupMessage};
use crate::infrastructure::dto::http as dto;
use crate::usecase::{SubmitCommand, SubmitSignalError, Submission};

// ========================================
// DTO → Domain
// ========================================

impl From<dto::RoleDto> for Role {
    fn from(dto: dto::RoleDto) -> Self {
        match dto {
            dto::RoleDto::Host => Role::Host,
            dto::RoleDto::Guest => Role::Guest,
            dto::RoleDto::Observer => Role::Observer,
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, SubmitSignalError> {
    value.ok_or_else(|| SubmitSignalError::BadRequest(format!("missing required field '{field}'")))
}

fn parse_kind(kind: &str) -> Result<dto::SignalKindDto, SubmitSignalError> {
    match kind {
        "offer" => Ok(dto::SignalKindDto::Offer),
        "answer" => Ok(dto::SignalKindDto::Answer),
        "candidate" => Ok(dto::SignalKindDto::Candidate),
        "disconnect" => Ok(dto::SignalKindDto::Disconnect),
        other => Err(SubmitSignalError::BadRequest(format!(
            "unknown message kind '{other}'"
        ))),
    }
}

impl TryFrom<dto::SubmitRequestDto> for SubmitCommand {
    type Error = SubmitSignalError;

    fn try_from(dto: dto::SubmitRequestDto) -> Result<Self, Self::Error> {
        let room_id = RoomId::new(required(dto.room_id, "roomId")?)
            .map_err(|e| SubmitSignalError::BadRequest(format!("invalid roomId: {e}")))?;
        let participant_id = ParticipantId::new(required(dto.participant_id, "participantId")?)
            .map_err(|e| SubmitSignalError::BadRequest(format!("invalid participantId: {e}")))?;
        let message = required(dto.message, "message")?;
        let kind = parse_kind(&required(message.kind, "message.kind")?)?;

        let setup_kind = match kind {
            dto::SignalKindDto::Offer => MessageKind::Offer,
            dto::SignalKindDto::Answer => MessageKind::Answer,
            dto::SignalKindDto::Candidate => MessageKind::Candidate,
            dto::SignalKindDto::Disconnect => {
                return Ok(SubmitCommand {
                    room_id,
                    participant_id,
                    submission: Submission::Disconnect,
                });
            }
        };
        let payload = match message.payload {
            Some(payload) if !payload.is_null() => payload,
            _ => {
                return Err(SubmitSignalError::BadRequest(
                    "missing required field 'message.payload'".to_string(),
                ));
            }
        };
        let submission = Submission::Setup {
            kind: setup_kind,
            payload,
        };

        Ok(SubmitCommand {
            room_id,
            participant_id,
            submission,
        })
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<Role> for dto::RoleDto {
    fn from(role: Role) -> Self {
        match role {
            Role::Host => dto::RoleDto::Host,
            Role::Guest => dto::RoleDto::Guest,
            Role::Observer => dto::RoleDto::Observer,
        }
    }
}

impl From<MessageKind> for dto::SignalKindDto {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Offer => dto::SignalKindDto::Offer,
            MessageKind::Answer => dto::SignalKindDto::Answer,
            MessageKind::Candidate => dto::SignalKindDto::Candidate,
        }
    }
}

impl From<SetupMessage> for dto::LoggedMessageDto {
    fn from(message: SetupMessage) -> Self {
        Self {
            kind: message.kind.into(),
            participant_id: message.from.into_string(),
            payload: message.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: Option<&str>, payload: Option<serde_json::Value>) -> dto::SubmitRequestDto {
        dto::SubmitRequestDto {
            room_id: Some("r1".to_string()),
            participant_id: Some("alice".to_string()),
            message: Some(dto::SubmittedMessageDto {
                kind: kind.map(str::to_string),
                payload,
            }),
        }
    }

    #[test]
    fn test_submit_request_to_setup_command() {
        // テスト項目: offer の投稿がドメインのコマンドに変換される
        // given (前提条件):
        let dto = request(Some("offer"), Some(json!({ "type": "offer", "sdp": "v=0" })));

        // when (操作):
        let command = SubmitCommand::try_from(dto).unwrap();

        // then (期待する結果):
        assert_eq!(command.room_id.as_str(), "r1");
        assert_eq!(command.participant_id.as_str(), "alice");
        assert_eq!(
            command.submission,
            Submission::Setup {
                kind: MessageKind::Offer,
                payload: json!({ "type": "offer", "sdp": "v=0" }),
            }
        );
    }

    #[test]
    fn test_submit_request_maps_each_setup_kind() {
        // テスト項目: answer と candidate がそれぞれ対応するメッセージ種別に変換される
        // given (前提条件):
        let answer = request(Some("answer"), Some(json!({ "type": "answer", "sdp": "v=0" })));
        let candidate = request(Some("candidate"), Some(json!({ "candidate": "c1" })));

        // when (操作):
        let answer = SubmitCommand::try_from(answer).unwrap();
        let candidate = SubmitCommand::try_from(candidate).unwrap();

        // then (期待する結果):
        assert!(matches!(
            answer.submission,
            Submission::Setup {
                kind: MessageKind::Answer,
                ..
            }
        ));
        assert!(matches!(
            candidate.submission,
            Submission::Setup {
                kind: MessageKind::Candidate,
                ..
            }
        ));
    }

    #[test]
    fn test_submit_request_missing_room_id_is_bad_request() {
        // テスト項目: roomId が欠けている投稿は BadRequest になる
        // given (前提条件):
        let mut dto = request(Some("offer"), Some(json!({})));
        dto.room_id = None;

        // when (操作):
        let result = SubmitCommand::try_from(dto);

        // then (期待する結果):
        assert!(matches!(result, Err(SubmitSignalError::BadRequest(msg)) if msg.contains("roomId")));
    }

    #[test]
    fn test_submit_request_missing_kind_is_bad_request() {
        // テスト項目: message.kind が欠けている投稿は BadRequest になる
        // given (前提条件):
        let dto = request(None, Some(json!({})));

        // when (操作):
        let result = SubmitCommand::try_from(dto);

        // then (期待する結果):
        assert!(matches!(result, Err(SubmitSignalError::BadRequest(_))));
    }

    #[test]
    fn test_submit_request_setup_without_payload_is_bad_request() {
        // テスト項目: payload のない candidate は BadRequest になる
        // given (前提条件):
        let dto = request(Some("candidate"), None);

        // when (操作):
        let result = SubmitCommand::try_from(dto);

        // then (期待する結果):
        assert!(matches!(result, Err(SubmitSignalError::BadRequest(msg)) if msg.contains("payload")));
    }

    #[test]
    fn test_submit_request_disconnect_needs_no_payload() {
        // テスト項目: disconnect は payload なしで受け付けられる
        // given (前提条件):
        let dto = request(Some("disconnect"), None);

        // when (操作):
        let command = SubmitCommand::try_from(dto).unwrap();

        // then (期待する結果):
        assert_eq!(command.submission, Submission::Disconnect);
    }

    #[test]
    fn test_submit_request_unknown_kind_is_bad_request() {
        // テスト項目: 未知の kind は BadRequest になる
        // given (前提条件):
        let dto = request(Some("create"), Some(json!({})));

        // when (操作):
        let result = SubmitCommand::try_from(dto);

        // then (期待する結果):
        assert!(matches!(result, Err(SubmitSignalError::BadRequest(msg)) if msg.contains("create")));
    }

    #[test]
    fn test_setup_message_to_dto() {
        // テスト項目: ドメインの SetupMessage が DTO に変換される
        // given (前提条件):
        let message = SetupMessage::new(
            MessageKind::Candidate,
            ParticipantId::new("bob".to_string()).unwrap(),
            json!({ "candidate": "c1" }),
        );

        // when (操作):
        let dto: dto::LoggedMessageDto = message.into();

        // then (期待する結果):
        assert_eq!(dto.kind, dto::SignalKindDto::Candidate);
        assert_eq!(dto.participant_id, "bob");
        assert_eq!(dto.payload, json!({ "candidate": "c1" }));
    }
}
