//! UseCase: シグナリングメッセージの投稿処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SubmitSignalUseCase::execute() メソッド
//! - 初回投稿でのルーム自動作成、ログへの追加、観戦者の拒否、disconnect
//!
//! ### なぜこのテストが必要か
//! - 最初に投稿した参加者が必ずホストになることがフィルタリングの前提
//! - 観戦者がネゴシエーション状態を変更できないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：offer / answer / candidate の投稿
//! - 異常系：追加前にルームが消えた場合
//! - エッジケース：3人目の投稿、disconnect 後のルーム

use std::sync::Arc;

use parley_shared::time::Clock;
use serde_json::Value;

use crate::domain::{
    MessageKind, ParticipantId, RepositoryError, RoomId, RoomRepository, SetupMessage, Timestamp,
};

use super::error::SubmitSignalError;

/// 投稿内容
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// ログに追加されるセットアップメッセージ
    Setup { kind: MessageKind, payload: Value },
    /// ルームのクローズ要求（ログには追加されない）
    Disconnect,
}

/// 検証済みの投稿リクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitCommand {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub submission: Submission,
}

/// 投稿結果（観測用のカウンタを含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub accepted: bool,
    pub participant_count: usize,
    pub message_count: usize,
}

/// シグナリングメッセージ投稿のユースケース
pub struct SubmitSignalUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl SubmitSignalUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 投稿を実行
    ///
    /// 指定 ID のルームが無ければ投稿者をホストとして作成してから追加する。
    pub async fn execute(&self, command: SubmitCommand) -> Result<SubmitOutcome, SubmitSignalError> {
        let now = Timestamp::new(self.clock.now_millis());
        self.repository.sweep_expired(now).await;

        let SubmitCommand {
            room_id,
            participant_id,
            submission,
        } = command;

        match submission {
            Submission::Setup { kind, payload } => {
                self.ensure_room(&room_id, &participant_id, now).await;

                let message = SetupMessage::new(kind, participant_id.clone(), payload);
                let receipt = self
                    .repository
                    .append(&room_id, message)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound(id) | RepositoryError::AlreadyExists(id) => {
                            SubmitSignalError::RoomNotFound(id)
                        }
                    })?;

                if receipt.accepted {
                    tracing::info!(
                        "Stored {} from '{}' ({}) in room '{}' (messages: {})",
                        kind,
                        participant_id,
                        receipt.role,
                        room_id,
                        receipt.message_count
                    );
                } else {
                    tracing::debug!(
                        "Ignored {} from observer '{}' in room '{}'",
                        kind,
                        participant_id,
                        room_id
                    );
                }

                Ok(SubmitOutcome {
                    accepted: receipt.accepted,
                    participant_count: receipt.participant_count,
                    message_count: receipt.message_count,
                })
            }
            Submission::Disconnect => self.disconnect(&room_id, &participant_id).await,
        }
    }

    async fn ensure_room(&self, room_id: &RoomId, participant_id: &ParticipantId, now: Timestamp) {
        if self
            .repository
            .create(room_id.clone(), participant_id.clone(), now)
            .await
            .is_ok()
        {
            tracing::info!(
                "Room '{}' auto-created on first submission by '{}'",
                room_id,
                participant_id
            );
        }
    }

    async fn disconnect(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<SubmitOutcome, SubmitSignalError> {
        let participants = match self.repository.participants_of(room_id).await {
            Ok(participants) => participants,
            // Nothing left to close
            Err(_) => {
                return Ok(SubmitOutcome {
                    accepted: false,
                    participant_count: 0,
                    message_count: 0,
                });
            }
        };

        let accepted = self
            .repository
            .close(room_id, participant_id)
            .await
            .unwrap_or(false);
        if accepted {
            tracing::info!("Room '{}' closed by '{}'", room_id, participant_id);
        }

        Ok(SubmitOutcome {
            accepted,
            participant_count: participants.len(),
            message_count: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repository::InMemoryRoomRepository;
    use parley_shared::time::ManualClock;
    use serde_json::json;

    fn room_id(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    fn pid(value: &str) -> ParticipantId {
        ParticipantId::new(value.to_string()).unwrap()
    }

    fn setup(room: &str, from: &str, kind: MessageKind) -> SubmitCommand {
        SubmitCommand {
            room_id: room_id(room),
            participant_id: pid(from),
            submission: Submission::Setup {
                kind,
                payload: json!({ "from": from }),
            },
        }
    }

    fn create_usecase() -> (SubmitSignalUseCase, Arc<InMemoryRoomRepository>) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let usecase =
            SubmitSignalUseCase::new(repository.clone(), Arc::new(ManualClock::new(0)));
        (usecase, repository)
    }

    #[tokio::test]
    async fn test_first_submission_creates_room_with_submitter_as_host() {
        // テスト項目: 新しい ID への最初の投稿でルームが作成され、投稿者が participants[0] になる
        // given (前提条件):
        let (usecase, repository) = create_usecase();

        // when (操作):
        let outcome = usecase
            .execute(setup("fresh", "alice", MessageKind::Offer))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            SubmitOutcome {
                accepted: true,
                participant_count: 1,
                message_count: 1
            }
        );
        let participants = repository.participants_of(&room_id("fresh")).await.unwrap();
        assert_eq!(participants[0], pid("alice"));
    }

    #[tokio::test]
    async fn test_second_participant_answer_is_appended() {
        // テスト項目: 2人目の answer がログに追加され、カウンタが増える
        // given (前提条件):
        let (usecase, _repository) = create_usecase();
        usecase
            .execute(setup("r1", "alice", MessageKind::Offer))
            .await
            .unwrap();

        // when (操作):
        let outcome = usecase
            .execute(setup("r1", "bob", MessageKind::Answer))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(outcome.accepted);
        assert_eq!(outcome.participant_count, 2);
        assert_eq!(outcome.message_count, 2);
    }

    #[tokio::test]
    async fn test_observer_submission_is_not_accepted() {
        // テスト項目: 3人目の投稿は accepted=false となり、ログは変わらない
        // given (前提条件):
        let (usecase, repository) = create_usecase();
        usecase
            .execute(setup("r1", "alice", MessageKind::Offer))
            .await
            .unwrap();
        usecase
            .execute(setup("r1", "bob", MessageKind::Answer))
            .await
            .unwrap();

        // when (操作):
        let outcome = usecase
            .execute(setup("r1", "carol", MessageKind::Answer))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!outcome.accepted);
        assert_eq!(outcome.message_count, 2);
        let room = repository.get(&room_id("r1")).await.unwrap();
        assert_eq!(room.participants, vec![pid("alice"), pid("bob")]);
    }

    #[tokio::test]
    async fn test_disconnect_closes_room() {
        // テスト項目: アクティブ参加者の disconnect でルームが閉じられ、次の sweep で消える
        // given (前提条件):
        let (usecase, repository) = create_usecase();
        usecase
            .execute(setup("r1", "alice", MessageKind::Offer))
            .await
            .unwrap();

        // when (操作):
        let outcome = usecase
            .execute(SubmitCommand {
                room_id: room_id("r1"),
                participant_id: pid("alice"),
                submission: Submission::Disconnect,
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert!(outcome.accepted);
        assert!(repository.get(&room_id("r1")).await.is_err());
        repository.sweep_expired(Timestamp::new(0)).await;
        assert_eq!(repository.count_rooms().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_for_unknown_room_is_not_an_error() {
        // テスト項目: 存在しないルームへの disconnect はエラーにならず accepted=false
        // given (前提条件):
        let (usecase, _repository) = create_usecase();

        // when (操作):
        let outcome = usecase
            .execute(SubmitCommand {
                room_id: room_id("ghost"),
                participant_id: pid("alice"),
                submission: Submission::Disconnect,
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!outcome.accepted);
    }
}
