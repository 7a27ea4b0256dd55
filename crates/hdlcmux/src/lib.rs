//! HDLC-style channel multiplexing over UART links.
//!
//! Frames are flag-delimited, byte-stuffed and protected by CRC-16/X-25. The
//! address byte selects a logical channel (data or debug); information frames
//! are acknowledged by the receiving side.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-sink seam, in-memory wire, UART adapter (behind `serial`)
//! - [`frame`]: CRC, escaping, transmit ring, encoder and streaming decoder
//! - [`link`]: per-link engine with drain worker and ACK generation (behind `link`)

/// Re-export transport types.
pub mod transport {
    pub use hdlcmux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hdlcmux_frame::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use hdlcmux_link::*;
}
