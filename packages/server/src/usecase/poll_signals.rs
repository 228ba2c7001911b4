//! UseCase: シグナリングメッセージの取得処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PollSignalsUseCase::execute() メソッド
//! - 役割ごとのフィルタリング、verify フラグ、期限切れの扱い
//!
//! ### なぜこのテストが必要か
//! - ゲストの answer がホスト以外に渡らないこと、ホストが自分の offer を受け取らないことを保証
//! - 期限切れのルームはエラーではなく「消えた」応答になることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ホスト・ゲストそれぞれの取得
//! - エッジケース：1199 秒 / 1200 秒経過時点、存在しないルーム、3人目の読み手

use std::sync::Arc;

use parley_shared::time::Clock;

use crate::domain::{ParticipantId, RoomId, RoomRepository, RoomView, Timestamp, expires_in_seconds};

/// 取得結果
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// ルームが存在しない（作成されていない、期限切れ、クローズ済み）
    Gone,
    Active {
        view: RoomView,
        expires_in_seconds: i64,
    },
}

/// シグナリングメッセージ取得のユースケース
pub struct PollSignalsUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl PollSignalsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 取得を実行
    ///
    /// 読み手は空席があれば参加者として登録される。
    ///
    /// # Arguments
    ///
    /// * `room_id` - 対象ルームの ID
    /// * `reader` - 読み手の参加者 ID
    /// * `verify` - true の場合、アクティブな参加者はログ全体を受け取る
    ///
    /// # Returns
    ///
    /// * `PollOutcome::Active` - 読み手に見えるメッセージと残り時間
    /// * `PollOutcome::Gone` - ルームが存在しない
    pub async fn execute(&self, room_id: &RoomId, reader: &ParticipantId, verify: bool) -> PollOutcome {
        let now = Timestamp::new(self.clock.now_millis());
        let swept = self.repository.sweep_expired(now).await;
        if !swept.is_empty() {
            tracing::debug!("Swept {} expired room(s)", swept.len());
        }

        match self.repository.read(room_id, reader, verify).await {
            Ok(view) => PollOutcome::Active {
                expires_in_seconds: expires_in_seconds(view.created_at, now),
                view,
            },
            Err(_) => PollOutcome::Gone,
        }
    }
}
