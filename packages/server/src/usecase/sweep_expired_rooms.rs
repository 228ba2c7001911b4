//! UseCase: 期限切れルームの定期削除
//!
//! リクエスト毎の遅延削除に加え、アイドル時にもメモリを解放するためバックグラウンドで実行する。

use std::{sync::Arc, time::Duration};

use parley_shared::time::Clock;

use crate::domain::{RoomId, RoomRepository, Timestamp};

pub struct SweepExpiredRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl SweepExpiredRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 1回分の削除を実行し、削除したルーム ID を返す
    pub async fn execute(&self) -> Vec<RoomId> {
        let now = Timestamp::new(self.clock.now_millis());
        let removed = self.repository.sweep_expired(now).await;
        for room_id in &removed {
            tracing::info!("Room '{}' expired and was removed", room_id);
        }
        removed
    }

    /// `interval` 毎に削除を繰り返す（タスクが破棄されるまで終わらない）
    pub async fn run_every(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // 最初の tick は即座に完了する
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.execute().await;
        }
    }
}
