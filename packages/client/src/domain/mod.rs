//! Client-side domain: connection states, envelopes and negotiation bookkeeping.

pub mod envelope;
pub mod negotiation;
pub mod state;

pub use envelope::{Clocks, Color, DEFAULT_CLOCK_SECONDS, Envelope, InvalidSquare, Square};
pub use negotiation::{CandidateAction, CandidateLedger};
pub use state::{ConnectionState, PeerRole, Trigger};
