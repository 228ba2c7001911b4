//! UseCase 層
//!
//! Room Store を操作する中継サーバーのユースケース群。
//! 全てのユースケースは処理の最初に期限切れルームを削除する。

mod create_room;
mod error;
mod get_room_detail;
mod poll_signals;
mod submit_signal;
mod sweep_expired_rooms;

pub use create_room::{CreateRoomUseCase, RoomCreated};
pub use error::{CreateRoomError, GetRoomDetailError, SubmitSignalError};
pub use get_room_detail::{GetRoomDetailUseCase, RoomDetail};
pub use poll_signals::{PollOutcome, PollSignalsUseCase};
pub use submit_signal::{SubmitCommand, SubmitOutcome, Submission, SubmitSignalUseCase};
pub use sweep_expired_rooms::SweepExpiredRoomsUseCase;
