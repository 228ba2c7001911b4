//! UseCase 層のエラー定義

use thiserror::Error;

/// ルーム作成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateRoomError {
    #[error("room '{0}' already exists")]
    AlreadyExists(String),
}

/// シグナリングメッセージ投稿のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitSignalError {
    /// 必須フィールドの欠落・不正（そのリクエストにとってのみ致命的）
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 自動作成と追加の間にルームが消えた
    #[error("room '{0}' not found or expired")]
    RoomNotFound(String),
}

/// ルーム詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("room not found or expired")]
    RoomNotFound,
}
