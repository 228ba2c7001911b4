mod http;

pub use http::{create_room, get_room_detail, health_check, poll_signals, submit_signal};
