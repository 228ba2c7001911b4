//! Message formatting utilities for client display.

use parley_server::infrastructure::dto::http::{RoleDto, RoomDetailDto};

use crate::{
    domain::{Clocks, Color, PeerRole},
    rules::MoveResult,
    session::SessionWarning,
};

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a relay room snapshot
    ///
    /// # Arguments
    ///
    /// * `detail` - Room detail returned by the relay
    /// * `current_participant_id` - Marked as "(me)" when present in the room
    pub fn format_room_detail(detail: &RoomDetailDto, current_participant_id: Option<&str>) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{RULE}\n"));
        output.push_str(&format!("Room: {}\n", detail.id));
        output.push_str(&format!("Created at: {}\n", detail.created_at));
        output.push_str(&format!(
            "Expires in: {}\n",
            Self::format_remaining(detail.expires_in_seconds)
        ));
        output.push_str(&format!("Setup messages: {}\n", detail.message_count));
        output.push_str("Participants:\n");

        if detail.participants.is_empty() {
            output.push_str("(No participants)\n");
        } else {
            for participant in &detail.participants {
                let is_me = current_participant_id == Some(participant.participant_id.as_str());
                let me_suffix = if is_me { " (me)" } else { "" };
                let role = match participant.role {
                    RoleDto::Host => "host",
                    RoleDto::Guest => "guest",
                    RoleDto::Observer => "observer",
                };
                output.push_str(&format!(
                    "{}{} - {}\n",
                    participant.participant_id, me_suffix, role
                ));
            }
        }

        output.push_str(&format!("{RULE}\n"));
        output
    }

    /// Format the connection-established banner
    pub fn format_connected(room_id: &str, role: PeerRole, color: Color) -> String {
        format!("\n* connected to room {room_id} as {role}, playing {color}\n")
    }

    pub fn format_spectating(room_id: &str) -> String {
        format!("\n* room {room_id} is full, spectating\n")
    }

    pub fn format_move(result: &MoveResult) -> String {
        let capture = if result.captured { "x" } else { "-" };
        format!("{}: {}{}{}\n", result.color, result.from, capture, result.to)
    }

    /// Format a chat line
    ///
    /// # Arguments
    ///
    /// * `text` - Message body
    /// * `sender` - Sender's colour, when announced
    /// * `sent_at` - Unix timestamp (milliseconds)
    pub fn format_chat(text: &str, sender: Option<Color>, sent_at: i64) -> String {
        let from = sender.map_or_else(|| "peer".to_string(), |color| color.to_string());
        format!(
            "\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            from,
            text,
            parley_shared::time::timestamp_to_rfc3339(sent_at)
        )
    }

    /// Format both clocks as `mm:ss`
    pub fn format_clocks(clocks: Clocks) -> String {
        format!(
            "white {} | black {}\n",
            Self::format_clock(clocks.white),
            Self::format_clock(clocks.black)
        )
    }

    fn format_clock(seconds: u32) -> String {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }

    fn format_remaining(seconds: i64) -> String {
        if seconds <= 0 {
            "expired".to_string()
        } else {
            format!("{}m {:02}s", seconds / 60, seconds % 60)
        }
    }

    pub fn format_game_start(own_color: Color) -> String {
        format!("\n* game started, you play {own_color}\n")
    }

    pub fn format_warning(warning: &SessionWarning) -> String {
        match warning {
            SessionWarning::ProtocolDesync { from, to } => {
                format!("! peer move {from}-{to} is illegal here, boards may have diverged\n")
            }
            SessionWarning::RoomExpiring { seconds_left } => format!(
                "! relay room expires in {}\n",
                Self::format_remaining(*seconds_left)
            ),
            SessionWarning::ColorMismatch { derived, announced } => {
                format!("! host announced {announced}, but the offer implied {derived}\n")
            }
            SessionWarning::PeerLost => "! connection to peer lost\n".to_string(),
        }
    }

    pub fn format_peer_disconnected() -> String {
        "\n- peer left the game\n".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Square;
    use parley_server::infrastructure::dto::http::ParticipantDetailDto;

    #[test]
    fn test_format_room_detail_marks_me() {
        // テスト項目: ルーム詳細に参加者のロールが表示され、自分には "(me)" が付く
        // given (前提条件):
        let detail = RoomDetailDto {
            id: "r1".to_string(),
            participants: vec![
                ParticipantDetailDto {
                    participant_id: "alice".to_string(),
                    role: RoleDto::Host,
                },
                ParticipantDetailDto {
                    participant_id: "bob".to_string(),
                    role: RoleDto::Guest,
                },
            ],
            message_count: 3,
            created_at: "1970-01-01T00:00:00+00:00".to_string(),
            expires_in_seconds: 1199,
        };

        // when (操作):
        let output = MessageFormatter::format_room_detail(&detail, Some("bob"));

        // then (期待する結果):
        assert!(output.contains("Room: r1\n"));
        assert!(output.contains("Expires in: 19m 59s\n"));
        assert!(output.contains("alice - host\n"));
        assert!(output.contains("bob (me) - guest\n"));
    }

    #[test]
    fn test_format_room_detail_without_participants() {
        // テスト項目: 参加者がいない・期限切れのルームの表示
        // given (前提条件):
        let detail = RoomDetailDto {
            id: "r1".to_string(),
            participants: vec![],
            message_count: 0,
            created_at: "1970-01-01T00:00:00+00:00".to_string(),
            expires_in_seconds: 0,
        };

        // when (操作):
        let output = MessageFormatter::format_room_detail(&detail, None);

        // then (期待する結果):
        assert!(output.contains("(No participants)\n"));
        assert!(output.contains("Expires in: expired\n"));
    }

    #[test]
    fn test_format_clocks() {
        // テスト項目: 時計が mm:ss 形式で表示される
        // given (前提条件):
        let clocks = Clocks {
            white: 300,
            black: 59,
        };

        // when (操作):
        let output = MessageFormatter::format_clocks(clocks);

        // then (期待する結果):
        assert_eq!(output, "white 05:00 | black 00:59\n");
    }

    #[test]
    fn test_format_move_with_capture() {
        // テスト項目: 駒取りは "x" で表示される
        // given (前提条件):
        let result = MoveResult {
            from: "e4".parse::<Square>().unwrap(),
            to: "d5".parse::<Square>().unwrap(),
            color: Color::White,
            captured: true,
        };

        // when (操作):
        let output = MessageFormatter::format_move(&result);

        // then (期待する結果):
        assert_eq!(output, "white: e4xd5\n");
    }

    #[test]
    fn test_format_chat_without_sender() {
        // テスト項目: 送信者の色が無いチャットは "peer" として表示される
        // given (前提条件):
        let sent_at = 0;

        // when (操作):
        let output = MessageFormatter::format_chat("hello", None, sent_at);

        // then (期待する結果):
        assert!(output.contains("@peer: hello\n"));
        assert!(output.contains("sent at 1970-01-01T00:00:00+00:00\n"));
    }
}
