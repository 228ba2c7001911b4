//! Utilities shared by the Parley relay and peer client.

pub mod logger;
pub mod time;
