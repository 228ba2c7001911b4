//! Signaling relay for two-peer game sessions.
//!
//! Layers, inner first: `domain` (room model and store contract), `usecase`
//! (one use case per relay operation), `infrastructure` (in-memory store and
//! wire DTOs) and `ui` (the axum server).

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
