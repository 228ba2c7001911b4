//! Client configuration.

use std::time::Duration;

use crate::{domain::Color, retry::RetryPolicy};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Guest polling for the host's offer
    pub offer_discovery: RetryPolicy,
    /// Period of setup polls while establishing
    pub setup_poll_interval: Duration,
    /// Retries of a relay request that failed in transit
    pub transport_retry: RetryPolicy,
    /// Warn once the room has fewer seconds left than this
    pub expiry_warning_secs: i64,
    /// Host colour; random when unset
    pub host_color: Option<Color>,
    /// Fresh room ids to try when the relay reports a collision
    pub create_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            offer_discovery: RetryPolicy::fixed(10, Duration::from_secs(1)),
            setup_poll_interval: Duration::from_secs(1),
            transport_retry: RetryPolicy::fixed(5, Duration::from_secs(1)),
            expiry_warning_secs: 60,
            host_color: None,
            create_attempts: 3,
        }
    }
}

impl ClientConfig {
    /// Same budgets with every interval scaled to `interval` (tests, demos)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.offer_discovery.interval = interval;
        self.setup_poll_interval = interval;
        self.transport_retry.interval = interval;
        self
    }
}
