//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    AppendReceipt, ParticipantId, RepositoryError, Room, RoomId, RoomView, SetupMessage,
    Timestamp,
};

/// Room Repository trait
///
/// Room Store の契約。全ての変更は同じルームに対して排他的に行われる。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// ルームを作成し、`creator` をホストとして登録する
    ///
    /// 同じ ID のルームが既にあれば `AlreadyExists`
    async fn create(
        &self,
        room_id: RoomId,
        creator: ParticipantId,
        created_at: Timestamp,
    ) -> Result<Room, RepositoryError>;

    /// ルームのスナップショットを取得
    async fn get(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 送信者を登録したうえでセットアップメッセージを追加
    async fn append(
        &self,
        room_id: &RoomId,
        message: SetupMessage,
    ) -> Result<AppendReceipt, RepositoryError>;

    /// 読み手を登録し、読み手に見えるメッセージを返す
    async fn read(
        &self,
        room_id: &RoomId,
        reader: &ParticipantId,
        verify: bool,
    ) -> Result<RoomView, RepositoryError>;

    /// ルームの参加者リストを取得（参加順）
    async fn participants_of(&self, room_id: &RoomId)
    -> Result<Vec<ParticipantId>, RepositoryError>;

    /// アクティブな参加者による disconnect を記録。ルームは次の sweep で削除される
    ///
    /// 記録された場合 `true`、観戦者からの要求なら `false`
    async fn close(
        &self,
        room_id: &RoomId,
        requested_by: &ParticipantId,
    ) -> Result<bool, RepositoryError>;

    /// 期限切れ・クローズ済みのルームを削除し、削除した ID を返す
    async fn sweep_expired(&self, now: Timestamp) -> Vec<RoomId>;

    /// 保持しているルーム数
    async fn count_rooms(&self) -> usize;
}
