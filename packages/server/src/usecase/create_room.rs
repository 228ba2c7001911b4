//! UseCase: ルーム作成処理
//!
//! ### どのような状況を想定しているか
//! - 正常系：新しい ID でルームを作成し、作成者がホストになる
//! - 異常系：既に存在する ID での作成
//! - エッジケース：期限切れのルームと同じ ID での再作成

use std::sync::Arc;

use parley_shared::time::Clock;

use crate::domain::{
    ParticipantId, RepositoryError, Room, RoomId, RoomRepository, Timestamp, expires_in_seconds,
};

use super::error::CreateRoomError;

/// 作成されたルームの情報
#[derive(Debug, Clone, PartialEq)]
pub struct RoomCreated {
    pub room: Room,
    pub expires_in_seconds: i64,
}

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl CreateRoomUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// ルーム作成を実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 作成するルームの ID
    /// * `creator` - ホストとして登録される参加者
    pub async fn execute(
        &self,
        room_id: RoomId,
        creator: ParticipantId,
    ) -> Result<RoomCreated, CreateRoomError> {
        let now = Timestamp::new(self.clock.now_millis());
        self.repository.sweep_expired(now).await;

        match self.repository.create(room_id, creator.clone(), now).await {
            Ok(room) => {
                tracing::info!("Room '{}' created by '{}'", room.id, creator);
                Ok(RoomCreated {
                    expires_in_seconds: expires_in_seconds(room.created_at, now),
                    room,
                })
            }
            Err(RepositoryError::AlreadyExists(id)) | Err(RepositoryError::NotFound(id)) => {
                Err(CreateRoomError::AlreadyExists(id))
            }
        }
    }
}
