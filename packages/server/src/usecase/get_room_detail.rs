//! UseCase: ルーム詳細取得処理

use std::sync::Arc;

use parley_shared::time::Clock;

use crate::domain::{Room, RoomId, RoomRepository, Timestamp, expires_in_seconds};

use super::error::GetRoomDetailError;

/// ルーム詳細
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDetail {
    pub room: Room,
    pub expires_in_seconds: i64,
}

/// ルーム詳細取得のユースケース
///
/// 読み取り専用で、参加者の登録は行わない。
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn execute(&self, room_id: &RoomId) -> Result<RoomDetail, GetRoomDetailError> {
        let now = Timestamp::new(self.clock.now_millis());
        self.repository.sweep_expired(now).await;

        let room = self
            .repository
            .get(room_id)
            .await
            .map_err(|_| GetRoomDetailError::RoomNotFound)?;
        Ok(RoomDetail {
            expires_in_seconds: expires_in_seconds(room.created_at, now),
            room,
        })
    }
}
