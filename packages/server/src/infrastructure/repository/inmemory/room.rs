//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用し、単一の Mutex で全ルームへの変更を直列化します。
//! プロセスが再起動すると全てのルームは失われます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    AppendReceipt, ParticipantId, RepositoryError, Room, RoomId, RoomRepository, RoomView,
    SetupMessage, Timestamp,
};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// room_id -> Room
    rooms: Mutex<HashMap<RoomId, Room>>,
}

impl InMemoryRoomRepository {
    /// 空の InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(room_id: &RoomId) -> RepositoryError {
    RepositoryError::NotFound(room_id.as_str().to_string())
}

/// クローズ済みのルームは存在しないものとして扱う
fn live_room<'a>(
    rooms: &'a mut HashMap<RoomId, Room>,
    room_id: &RoomId,
) -> Result<&'a mut Room, RepositoryError> {
    rooms
        .get_mut(room_id)
        .filter(|room| !room.closed)
        .ok_or_else(|| not_found(room_id))
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create(
        &self,
        room_id: RoomId,
        creator: ParticipantId,
        created_at: Timestamp,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(&room_id) {
            return Err(RepositoryError::AlreadyExists(room_id.into_string()));
        }

        let mut room = Room::new(room_id.clone(), created_at);
        room.register(&creator);
        rooms.insert(room_id, room.clone());
        Ok(room)
    }

    async fn get(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        live_room(&mut rooms, room_id).map(|room| room.clone())
    }

    async fn append(
        &self,
        room_id: &RoomId,
        message: SetupMessage,
    ) -> Result<AppendReceipt, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = live_room(&mut rooms, room_id)?;
        Ok(room.append(message))
    }

    async fn read(
        &self,
        room_id: &RoomId,
        reader: &ParticipantId,
        verify: bool,
    ) -> Result<RoomView, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = live_room(&mut rooms, room_id)?;
        Ok(room.read(reader, verify))
    }

    async fn participants_of(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ParticipantId>, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        live_room(&mut rooms, room_id).map(|room| room.participants.clone())
    }

    async fn close(
        &self,
        room_id: &RoomId,
        requested_by: &ParticipantId,
    ) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = live_room(&mut rooms, room_id)?;
        if !room.role_of(requested_by).is_active() {
            return Ok(false);
        }
        room.close();
        Ok(true)
    }

    async fn sweep_expired(&self, now: Timestamp) -> Vec<RoomId> {
        let mut rooms = self.rooms.lock().await;
        let gone: Vec<RoomId> = rooms
            .values()
            .filter(|room| room.is_gone(now))
            .map(|room| room.id.clone())
            .collect();
        for room_id in &gone {
            rooms.remove(room_id);
        }
        gone
    }

    async fn count_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageKind, ROOM_TTL_MILLIS, Role};
    use serde_json::json;
    use std::sync::Arc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRoomRepository の作成・追加・読み出し・削除
    // - 読み出し時の参加者自動登録と上限
    // - sweep による期限切れ・クローズ済みルームの削除
    //
    // 【なぜこのテストが必要か】
    // - Repository は全 UseCase から呼ばれる Room Store の中核
    // - ルームの生存期間とホスト判定の正しさがシグナリング全体を支える
    // ========================================

    fn room_id(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    fn pid(value: &str) -> ParticipantId {
        ParticipantId::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_create_registers_creator_as_host() {
        // テスト項目: ルーム作成時に作成者がホストとして登録される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let room = repo
            .create(room_id("r1"), pid("alice"), Timestamp::new(0))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.participants, vec![pid("alice")]);
        assert_eq!(repo.count_rooms().await, 1);
    }

    #[tokio::test]
    async fn test_create_twice_fails_with_already_exists() {
        // テスト項目: 同じ ID で2回作成すると AlreadyExists になる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.create(room_id("r1"), pid("alice"), Timestamp::new(0))
            .await
            .unwrap();

        // when (操作):
        let result = repo
            .create(room_id("r1"), pid("bob"), Timestamp::new(10))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::AlreadyExists("r1".to_string())));
        let participants = repo.participants_of(&room_id("r1")).await.unwrap();
        assert_eq!(participants, vec![pid("alice")]);
    }

    #[tokio::test]
    async fn test_append_to_missing_room_fails_with_not_found() {
        // テスト項目: 存在しないルームへの追加は NotFound になる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let result = repo
            .append(
                &room_id("ghost"),
                SetupMessage::new(MessageKind::Offer, pid("alice"), json!({})),
            )
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::NotFound("ghost".to_string())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interleaved_append_and_read_keep_log_order() {
        // テスト項目: 追加と読み出しが並行しても、読み手には常にログ順の先頭部分が見える
        // given (前提条件):
        let repo = Arc::new(InMemoryRoomRepository::new());
        repo.create(room_id("r1"), pid("alice"), Timestamp::new(0))
            .await
            .unwrap();
        repo.read(&room_id("r1"), &pid("bob"), false).await.unwrap();
        let total = 40;

        // when (操作):
        let writer = {
            let repo = repo.clone();
            tokio::spawn(async move {
                for seq in 0..total {
                    let message = SetupMessage::new(
                        MessageKind::Candidate,
                        pid("alice"),
                        json!({ "candidate": "c", "seq": seq }),
                    );
                    repo.append(&room_id("r1"), message).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        let reader = {
            let repo = repo.clone();
            tokio::spawn(async move {
                let mut snapshots = Vec::new();
                for _ in 0..total {
                    let view = repo.read(&room_id("r1"), &pid("bob"), false).await.unwrap();
                    let seqs: Vec<i64> = view
                        .messages
                        .iter()
                        .map(|m| m.payload["seq"].as_i64().unwrap())
                        .collect();
                    snapshots.push(seqs);
                    tokio::task::yield_now().await;
                }
                snapshots
            })
        };
        let (written, snapshots) = tokio::join!(writer, reader);
        written.unwrap();
        let snapshots = snapshots.unwrap();

        // then (期待する結果):
        let mut previous_len = 0;
        for seqs in &snapshots {
            let expected: Vec<i64> = (0..seqs.len() as i64).collect();
            assert_eq!(seqs, &expected);
            assert!(seqs.len() >= previous_len);
            previous_len = seqs.len();
        }
        let final_view = repo.read(&room_id("r1"), &pid("bob"), false).await.unwrap();
        assert_eq!(final_view.messages.len(), total as usize);
        let participants = repo.participants_of(&room_id("r1")).await.unwrap();
        assert_eq!(participants, vec![pid("alice"), pid("bob")]);
    }

    #[tokio::test]
    async fn test_read_registers_reader_up_to_cap() {
        // テスト項目: 読み出しで参加者が自動登録され、3人目は観戦者になる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.create(room_id("r1"), pid("alice"), Timestamp::new(0))
            .await
            .unwrap();

        // when (操作):
        let guest_view = repo.read(&room_id("r1"), &pid("bob"), false).await.unwrap();
        let observer_view = repo
            .read(&room_id("r1"), &pid("carol"), false)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(guest_view.role, Role::Guest);
        assert_eq!(observer_view.role, Role::Observer);
        let participants = repo.participants_of(&room_id("r1")).await.unwrap();
        assert_eq!(participants, vec![pid("alice"), pid("bob")]);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_rooms_only() {
        // テスト項目: sweep は TTL を過ぎたルームだけを削除する
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.create(room_id("old"), pid("alice"), Timestamp::new(0))
            .await
            .unwrap();
        repo.create(room_id("new"), pid("bob"), Timestamp::new(600_000))
            .await
            .unwrap();

        // when (操作):
        let removed = repo.sweep_expired(Timestamp::new(ROOM_TTL_MILLIS)).await;

        // then (期待する結果):
        assert_eq!(removed, vec![room_id("old")]);
        assert_eq!(repo.count_rooms().await, 1);
        assert!(repo.get(&room_id("new")).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_by_observer_is_ignored() {
        // テスト項目: 観戦者による close は無視され、アクティブ参加者の close は記録される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.create(room_id("r1"), pid("alice"), Timestamp::new(0))
            .await
            .unwrap();
        repo.read(&room_id("r1"), &pid("bob"), false).await.unwrap();

        // when (操作):
        let by_observer = repo.close(&room_id("r1"), &pid("carol")).await.unwrap();
        let by_guest = repo.close(&room_id("r1"), &pid("bob")).await.unwrap();

        // then (期待する結果):
        assert!(!by_observer);
        assert!(by_guest);
        assert!(repo.get(&room_id("r1")).await.is_err());
        assert_eq!(
            repo.sweep_expired(Timestamp::new(1)).await,
            vec![room_id("r1")]
        );
    }
}
