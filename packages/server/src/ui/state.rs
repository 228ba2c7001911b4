//! Server state shared by the handlers.

use std::sync::Arc;

use crate::usecase::{
    CreateRoomUseCase, GetRoomDetailUseCase, PollSignalsUseCase, SubmitSignalUseCase,
};

/// Shared application state
pub struct AppState {
    /// CreateRoomUseCase（ルーム作成のユースケース）
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    /// SubmitSignalUseCase（メッセージ投稿のユースケース）
    pub submit_signal_usecase: Arc<SubmitSignalUseCase>,
    /// PollSignalsUseCase（メッセージ取得のユースケース）
    pub poll_signals_usecase: Arc<PollSignalsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
}
