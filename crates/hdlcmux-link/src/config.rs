use std::time::Duration;

use hdlcmux_frame::{DecoderConfig, RingConfig};

/// Configuration for one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Transmit ring sizing and backpressure.
    pub ring: RingConfig,
    /// Inbound reassembly and accepted addresses.
    pub decoder: DecoderConfig,
    /// Acknowledge valid information frames automatically.
    pub ack_information_frames: bool,
    /// How often the drain worker retries a transport that refused bytes.
    pub drain_poll_interval: Duration,
    /// How long shutdown may spend flushing the ring before giving up.
    pub shutdown_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            decoder: DecoderConfig::default(),
            ack_information_frames: true,
            drain_poll_interval: Duration::from_millis(20),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}
