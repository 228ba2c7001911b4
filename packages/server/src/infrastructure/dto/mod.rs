//! Data Transfer Objects (DTOs) for external communication.
//!
//! This module contains DTOs used for the relay's HTTP API and their
//! conversion from/to domain values.

pub mod conversion;
pub mod http;
