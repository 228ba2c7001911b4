//! Infrastructure layer: storage and wire formats.

pub mod dto;
pub mod repository;
